use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

pub(crate) async fn ensure_first_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_admin_email.is_empty() || admin.first_admin_password.is_empty() {
        tracing::warn!("FIRST_ADMIN_EMAIL/PASSWORD not configured; skipping admin bootstrap");
        return Ok(());
    }

    let email = &admin.first_admin_email;
    let user = repositories::users::find_by_email(state.db(), email).await?;
    let now = primitive_now_utc();

    if let Some(user) = user {
        let verified = security::verify_password(&admin.first_admin_password, &user.password_hash)
            .unwrap_or(false);
        let needs_update = !verified || user.role != UserRole::Admin || !user.is_active;

        if needs_update {
            let password_hash =
                security::hash_password(&admin.first_admin_password, state.settings())?;
            sqlx::query(
                "UPDATE users
                 SET password_hash = $1, role = $2, is_active = TRUE, updated_at = $3
                 WHERE id = $4",
            )
            .bind(password_hash)
            .bind(UserRole::Admin)
            .bind(now)
            .bind(&user.id)
            .execute(state.db())
            .await?;

            tracing::info!("Updated bootstrap admin {email}");
        } else {
            tracing::info!("Bootstrap admin already up to date");
        }

        return Ok(());
    }

    let password_hash = security::hash_password(&admin.first_admin_password, state.settings())?;

    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email,
            password_hash,
            role: UserRole::Admin,
            first_name: "Admin",
            last_name: "User",
            phone: None,
            is_active: true,
            teacher_id: None,
            student_id: None,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    tracing::info!("Created bootstrap admin {email}");
    Ok(())
}
