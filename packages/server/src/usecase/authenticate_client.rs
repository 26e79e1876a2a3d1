//! UseCase: ロール別チャンネルの認証
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - AuthenticateClientUseCase::execute() メソッド
//! - トークン検証 → ロール確認 → 主体の解決
//!
//! ### どのような状況を想定しているか
//! - 正常系：ロールが一致するトークン、ロールなしの旧トークン
//! - 異常系：トークンなし、ロール不一致、検証失敗、主体が見つからない

use std::sync::Arc;

use crate::domain::{AuthError, CredentialVerifier, Identity, IdentityResolver, Role};

/// ロール別チャンネルの認証のユースケース
pub struct AuthenticateClientUseCase {
    verifier: Arc<dyn CredentialVerifier>,
    resolver: Arc<dyn IdentityResolver>,
}

impl AuthenticateClientUseCase {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { verifier, resolver }
    }

    /// 認証を実行
    ///
    /// # Arguments
    ///
    /// * `token` - ベアラートークン（未指定なら `MissingCredential`）
    /// * `expected` - 接続先チャンネルのロール
    ///
    /// # Returns
    ///
    /// * `Ok(Identity)` - 解決された参加者
    /// * `Err(AuthError)` - 認証失敗（接続は登録前に閉じられる）
    pub async fn execute(&self, token: Option<&str>, expected: Role) -> Result<Identity, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let claims = self.verifier.verify_credential(token).await?;
        if claims.role.is_some_and(|role| role != expected) {
            return Err(AuthError::RoleMismatch { expected });
        }

        self.resolver.resolve_identity(expected, &claims.subject).await
    }
}
