use devflow::{
    auth::{project_user, AuthService},
    domain::{
        lifecycle::{self, Transition},
        CreateAccountRequest, PaymentEvidence, PaymentMethod, ProjectStatus, Role,
        SubmitProjectRequest,
    },
    repository::{
        ProjectRepository, SqliteProjectRepository,
        UserRepository, SqliteUserRepository,
    },
};
use clap::Parser;
use fake::{
    faker::{internet::en::SafeEmail, lorem::en::Paragraph, lorem::en::Words, name::en::Name},
    Fake,
};
use sqlx::sqlite::SqlitePoolOptions;

/// Populate a development database with an admin and a few clients.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Database to seed
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://devflow.db?mode=rwc")]
    database_url: String,

    /// Number of client accounts to create
    #[arg(long, default_value_t = 4)]
    clients: usize,

    /// Admin domain used by role resolution
    #[arg(long, default_value = "devflow.io")]
    admin_domain: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    println!("🌱 Starting database seeding...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    // Run migrations first
    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let user_repo = SqliteUserRepository::new(db_pool.clone());
    let project_repo = SqliteProjectRepository::new(db_pool.clone());

    println!("👤 Creating admin...");
    let admin_email = format!("admin@{}", args.admin_domain);
    let admin = user_repo
        .create(
            CreateAccountRequest {
                email: admin_email.clone(),
                display_name: Some("DevFlow Admin".to_string()),
                password: "admin12345".to_string(),
            },
            AuthService::hash_password("admin12345").await?,
        )
        .await?;
    user_repo.mark_email_verified(admin.id).await?;
    user_repo.assign_role(admin.id, Role::Admin).await?;
    println!("  ✅ Created admin ({} / admin12345)", admin_email);

    println!("👥 Creating clients and project requests...");
    let mut client_emails = Vec::new();
    for i in 0..args.clients {
        let email: String = SafeEmail().fake();
        let name: String = Name().fake();
        let account = user_repo
            .create(
                CreateAccountRequest {
                    email: email.to_lowercase(),
                    display_name: Some(name),
                    password: "password123".to_string(),
                },
                AuthService::hash_password("password123").await?,
            )
            .await?;
        let user = project_user(&account, &args.admin_domain);

        // Everyone gets a free trial, then a paid request
        for n in 0..2i64 {
            let words: Vec<String> = Words(2..4).fake();
            let request = SubmitProjectRequest {
                title: capitalize(&words.join(" ")),
                description: Paragraph(2..4).fake(),
                contact_email: None,
                budget: Some((10..101).fake::<u32>() as f64),
            };
            let plan = lifecycle::plan_new_project(&user, request, n)?;
            let project = project_repo.create(plan).await?;

            if !project.is_free_trial {
                // Spread paid requests across the payment pipeline
                let evidence = PaymentEvidence {
                    payment_method: [PaymentMethod::Jazzcash, PaymentMethod::Easypaisa, PaymentMethod::Bank][i % 3],
                    sender_name: user.name.clone(),
                    transaction_id: format!("TX{}", (100000..999999).fake::<u32>()),
                };
                if i % 2 == 0 {
                    let changes = lifecycle::apply_transition(&project, Transition::SubmitEvidence(evidence))?;
                    project_repo.update(project.id, changes).await?;
                }
            } else if i % 2 == 1 {
                let changes = lifecycle::apply_transition(&project, Transition::SetStatus(ProjectStatus::InProgress))?;
                project_repo.update(project.id, changes).await?;
            }
        }
        client_emails.push(account.email);
    }
    println!("  ✅ Created {} clients with 2 projects each", args.clients);

    println!("\n✨ Database seeding complete!");
    println!("\n📝 Test credentials:");
    println!("  Admin: {} / admin12345", admin_email);
    println!("  Clients: {}", client_emails.join(", "));
    println!("  Password for all clients: password123");

    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
