//! Prints the bcrypt hash of a password, for seeding `users.password_hash`
//! by hand.
//!
//! Usage: `hash_password [password]`. The cost comes from `BCRYPT_COST`,
//! default 10.

use positions_auth::auth::SecretHasher;
use positions_auth::validators::is_valid_password;

const DEFAULT_PASSWORD: &str = "changeme";
const DEFAULT_COST: u32 = 10;

fn hash_cost(configured: Option<String>) -> u32 {
    configured
        .and_then(|v| v.trim().parse().ok())
        .filter(|cost| (4..=31).contains(cost))
        .unwrap_or(DEFAULT_COST)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let password = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PASSWORD.to_string());

    if let Err(e) = is_valid_password(&password) {
        eprintln!("Refusing to hash: {}", e);
        std::process::exit(2);
    }

    let hasher = SecretHasher::new(hash_cost(std::env::var("BCRYPT_COST").ok()));
    match hasher.hash(&password).await {
        Ok(hash) => {
            println!("{}", hash);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            Err(std::io::Error::new(std::io::ErrorKind::Other, "hashing failed"))
        }
    }
}
