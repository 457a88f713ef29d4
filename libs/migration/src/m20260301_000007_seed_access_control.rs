use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const CUSTOMER_PERMISSIONS: &[&str] = &[
    "read:product",
    "read:category",
    "read:supplier",
    "read:review",
    "create:review",
    "update:review:own",
    "delete:review:own",
    "create:order",
    "read:order:own",
    "update:order:own",
    "read:user:own",
    "update:user:own",
    "delete:user:own",
    "create:supplier",
    "create:media",
    "read:media:own",
    "delete:media:own",
];

const ADMIN_SUBJECTS: &[&str] = &[
    "user", "role", "product", "category", "supplier", "order", "review", "media",
];

fn quoted_list(names: impl IntoIterator<Item = String>) -> String {
    names
        .into_iter()
        .map(|n| format!("('{n}')"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn admin_permissions() -> Vec<String> {
    ADMIN_SUBJECTS
        .iter()
        .flat_map(|subject| {
            [
                format!("create:{subject}"),
                format!("read:{subject}:all"),
                format!("update:{subject}:all"),
                format!("delete:{subject}:all"),
            ]
        })
        .collect()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Insert the built-in roles
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                INSERT INTO roles (id, name)
                VALUES
                    ('01960000-0000-7000-8000-000000000001', 'customer'),
                    ('01960000-0000-7000-8000-000000000002', 'admin'),
                    ('01960000-0000-7000-8000-000000000003', 'supplier')
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .await?;

        // Insert the permission catalog
        let mut all: Vec<String> = CUSTOMER_PERMISSIONS.iter().map(|p| ToString::to_string(p)).collect();
        for permission in admin_permissions() {
            if !all.contains(&permission) {
                all.push(permission);
            }
        }
        manager
            .get_connection()
            .execute_unprepared(&format!(
                "INSERT INTO permissions (name) VALUES {} ON CONFLICT (name) DO NOTHING",
                quoted_list(all),
            ))
            .await?;

        // Grant customer and supplier the self-service set. The supplier
        // role's product/profile powers come from the token's supplier
        // profile, not from rows here.
        for role in ["customer", "supplier"] {
            let names = CUSTOMER_PERMISSIONS
                .iter()
                .map(|n| format!("'{n}'"))
                .collect::<Vec<_>>()
                .join(", ");
            manager
                .get_connection()
                .execute_unprepared(&format!(
                    r#"
                    INSERT INTO role_permissions (role_id, permission_id)
                    SELECT r.id, p.id
                    FROM roles r, permissions p
                    WHERE r.name = '{role}' AND p.name IN ({names})
                    ON CONFLICT DO NOTHING
                    "#,
                ))
                .await?;
        }

        // Grant admin the full catalog
        let names = admin_permissions()
            .into_iter()
            .map(|n| format!("'{n}'"))
            .collect::<Vec<_>>()
            .join(", ");
        manager
            .get_connection()
            .execute_unprepared(&format!(
                r#"
                INSERT INTO role_permissions (role_id, permission_id)
                SELECT r.id, p.id
                FROM roles r, permissions p
                WHERE r.name = 'admin' AND p.name IN ({names})
                ON CONFLICT DO NOTHING
                "#,
            ))
            .await?;

        // Insert a bootstrap admin account (password: "password")
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                INSERT INTO users (id, email, name, password_hash, role_id, created_at, updated_at)
                VALUES (
                    '01960000-0000-7000-8000-0000000000aa',
                    'admin@storefront.local',
                    'Storefront Admin',
                    '$argon2id$v=19$m=19456,t=2,p=1$VE0rHYzGbYjDhGgvhdzFPw$CJpleaNYKGFpc44EFOyWTE+fG2Z0A+6Ka2SlQQzroYA',
                    '01960000-0000-7000-8000-000000000002',
                    NOW(),
                    NOW()
                )
                ON CONFLICT (email) DO NOTHING
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DELETE FROM users WHERE email = 'admin@storefront.local'")
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DELETE FROM role_permissions
                WHERE role_id IN (SELECT id FROM roles WHERE name IN ('customer', 'admin', 'supplier'))
                "#,
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DELETE FROM permissions")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DELETE FROM roles WHERE name IN ('customer', 'admin', 'supplier')")
            .await?;

        Ok(())
    }
}
