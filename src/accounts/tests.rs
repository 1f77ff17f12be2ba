//! Tests for accounts module

#[cfg(test)]
mod tests {
    use crate::common::id_generator::{generate_account_id, generate_user_id};
    use crate::common::migrations::run_migrations;
    use sqlx::SqlitePool;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    async fn seed_account(pool: &SqlitePool, name: &str, is_public: i64) -> (String, String) {
        let user_id = generate_user_id();
        let account_id = generate_account_id();
        sqlx::query("INSERT INTO users (id, subject) VALUES (?, ?)")
            .bind(&user_id)
            .bind(format!("auth0|{}", user_id))
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO accounts (id, user_id, name, is_public) VALUES (?, ?, ?, ?)")
            .bind(&account_id)
            .bind(&user_id)
            .bind(name)
            .bind(is_public)
            .execute(pool)
            .await
            .unwrap();
        (user_id, account_id)
    }

    #[tokio::test]
    async fn test_roster_lists_only_public_names() {
        let pool = test_pool().await;
        seed_account(&pool, "Visible Volunteer", 1).await;
        seed_account(&pool, "Private Volunteer", 0).await;

        let names: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM accounts WHERE is_public = 1 ORDER BY created_at DESC")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].0, "Visible Volunteer");

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn test_profile_update_persists() {
        let pool = test_pool().await;
        let (user_id, _) = seed_account(&pool, "Before", 0).await;

        sqlx::query(
            "UPDATE accounts SET name = ?, phone = ?, is_public = 1, \
             updated_at = datetime('now') WHERE user_id = ?",
        )
        .bind("After")
        .bind("208-555-0147")
        .bind(&user_id)
        .execute(&pool)
        .await
        .unwrap();

        let (name, phone, is_public): (String, Option<String>, i64) = sqlx::query_as(
            "SELECT name, phone, is_public FROM accounts WHERE user_id = ?",
        )
        .bind(&user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(name, "After");
        assert_eq!(phone.as_deref(), Some("208-555-0147"));
        assert_eq!(is_public, 1);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_account() {
        let pool = test_pool().await;
        let (user_id, _) = seed_account(&pool, "Leaving", 0).await;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(&user_id)
            .execute(&pool)
            .await
            .unwrap();

        let (accounts,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE user_id = ?")
                .bind(&user_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(accounts, 0);
    }
}
