use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

/// Where the question-bank catalogs live on disk.
#[derive(Debug, Deserialize, Clone)]
pub struct BankConfig {
    pub catalog_dir: PathBuf,
}

/// Round 1: all questions at once on a shared clock.
#[derive(Debug, Deserialize, Clone)]
pub struct Round1Config {
    pub duration_secs: i64,
    pub grace_secs: i64,
    /// Final score needed to advance to Round 2.
    pub pass_score: i32,
}

/// Round 2: sequential questions, an independent deadline each.
#[derive(Debug, Deserialize, Clone)]
pub struct Round2Config {
    /// Upper bound on questions served, regardless of catalog size.
    pub question_cap: usize,
    pub per_question_secs: i64,
    /// Final score needed to advance to Round 3. Zero means completing the
    /// round advances; this is deliberately independent from Round 3
    /// eligibility, which the leaderboard decides.
    pub pass_score: i32,
}

/// Round 3: open-ended challenges under admin review.
#[derive(Debug, Deserialize, Clone)]
pub struct Round3Config {
    pub challenges_per_track: usize,
    /// The only two deltas an admin may apply when scoring.
    pub score_accept: i32,
    pub score_reject: i32,
}

/// The top-N / minimum-percentage rule for Round 3 eligibility.
#[derive(Debug, Deserialize, Clone)]
pub struct QualificationConfig {
    pub top_n: usize,
    pub min_percentage: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompetitionConfig {
    pub round1: Round1Config,
    pub round2: Round2Config,
    pub round3: Round3Config,
    pub qualification: QualificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub bank: BankConfig,
    pub competition: CompetitionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("auth.token_ttl_days", 7)?
            .set_default("bank.catalog_dir", "./catalog")?
            .set_default("competition.round1.duration_secs", 20 * 60)?
            .set_default("competition.round1.grace_secs", 5 * 60)?
            .set_default("competition.round1.pass_score", 10)?
            .set_default("competition.round2.question_cap", 20)?
            .set_default("competition.round2.per_question_secs", 60)?
            .set_default("competition.round2.pass_score", 0)?
            .set_default("competition.round3.challenges_per_track", 3)?
            .set_default("competition.round3.score_accept", 4)?
            .set_default("competition.round3.score_reject", -1)?
            .set_default("competition.qualification.top_n", 10)?
            .set_default("competition.qualification.min_percentage", 30.0)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., ARENA__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("ARENA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self {
            round1: Round1Config {
                duration_secs: 20 * 60,
                grace_secs: 5 * 60,
                pass_score: 10,
            },
            round2: Round2Config {
                question_cap: 20,
                per_question_secs: 60,
                pass_score: 0,
            },
            round3: Round3Config {
                challenges_per_track: 3,
                score_accept: 4,
                score_reject: -1,
            },
            qualification: QualificationConfig {
                top_n: 10,
                min_percentage: 30.0,
            },
        }
    }
}
