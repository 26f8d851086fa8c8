//! Passcode sign-in.
//!
//! A sign-in issues a 7-digit single-use code with an explicit expiry, stored
//! against the account and delivered by mail. Verification consumes the code.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::*;

use crate::domain::DomainError;
use crate::mailer::Mailer;
use crate::models::login_token::{self, Entity as LoginToken};
use crate::models::user::{self, Entity as User};

/// Codes expire this many minutes after issue.
pub const CODE_TTL_MINUTES: i64 = 10;

fn generate_code() -> String {
    rand::thread_rng().gen_range(1_000_000..=9_999_999).to_string()
}

/// Issue a fresh passcode for the matching account and mail it out. Earlier
/// unused codes for the account are invalidated.
pub async fn request_code(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    username: &str,
    email: &str,
) -> Result<(), DomainError> {
    let account = User::find()
        .filter(user::Column::Username.eq(username))
        .filter(user::Column::Email.eq(email))
        .filter(user::Column::Role.eq("user"))
        .one(db)
        .await?
        .ok_or(DomainError::Validation(
            "Invalid username or email".to_string(),
        ))?;

    LoginToken::update_many()
        .col_expr(
            login_token::Column::Used,
            sea_orm::sea_query::Expr::value(true),
        )
        .filter(login_token::Column::UserId.eq(account.id))
        .filter(login_token::Column::Used.eq(false))
        .exec(db)
        .await?;

    let code = generate_code();
    let now = Utc::now();
    let token = login_token::ActiveModel {
        user_id: Set(account.id),
        code: Set(code.clone()),
        expires_at: Set((now + Duration::minutes(CODE_TTL_MINUTES)).to_rfc3339()),
        used: Set(false),
        created_at: Set(now.to_rfc3339()),
        ..Default::default()
    };
    token.insert(db).await?;

    let body = format!("Hello {}, your sign-in code is: {}", account.username, code);
    mailer.send(&account.email, "Your AgriRent sign-in code", &body).await?;

    Ok(())
}

/// Verify a passcode. The matching token must be unused and unexpired; it is
/// consumed here whether or not anything downstream fails.
pub async fn verify_code(
    db: &DatabaseConnection,
    username: &str,
    code: &str,
) -> Result<user::Model, DomainError> {
    let account = User::find()
        .filter(user::Column::Username.eq(username))
        .filter(user::Column::Role.eq("user"))
        .one(db)
        .await?
        .ok_or(DomainError::Validation("Invalid code".to_string()))?;

    let token = LoginToken::find()
        .filter(login_token::Column::UserId.eq(account.id))
        .filter(login_token::Column::Code.eq(code))
        .filter(login_token::Column::Used.eq(false))
        .order_by_desc(login_token::Column::CreatedAt)
        .one(db)
        .await?
        .ok_or(DomainError::Validation("Invalid code".to_string()))?;

    let expired = DateTime::parse_from_rfc3339(&token.expires_at)
        .map(|t| t.with_timezone(&Utc) < Utc::now())
        .unwrap_or(true);

    let mut active: login_token::ActiveModel = token.into();
    active.used = Set(true);
    active.update(db).await?;

    if expired {
        return Err(DomainError::Validation("Code has expired".to_string()));
    }

    Ok(account)
}
