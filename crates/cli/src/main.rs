//! # FocusGuard CLI
//!
//! 学生の集中度レポートを署名・暗号化して受け渡し、教師側で検証する。
//!
//! ## コマンド
//! | コマンド | 利用者 | 内容 |
//! |---------|-------|------|
//! | `keygen` | 教師 | 教師鍵ペア（`teacher_private.pem` / `teacher_public.pem`）を生成 |
//! | `verify` | 教師 | エンベロープを復号・署名検証して表示 |
//! | `import-teacher-key` | 学生 | 教師公開鍵を取り込む |
//! | `report` | 学生 | 集計値からエンベロープを生成 |
//! | `status` | 学生 | 鍵の状態を表示 |

mod display;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use focusguard_core::config::parse_encryption;
use focusguard_core::storage::ensure_dir;
use focusguard_core::{
    load_keypair_file, read_envelope, write_keypair, EnvelopeVerifier, ReportConfig, ReportError,
    ReportService,
};
use focusguard_crypto::{public_key_fingerprint, RsaKeyPair, DEFAULT_RSA_BITS};
use focusguard_types::FocusMetrics;

/// 教師秘密鍵のファイル名
const TEACHER_PRIVATE_KEY_FILE: &str = "teacher_private.pem";
/// 教師公開鍵のファイル名
const TEACHER_PUBLIC_KEY_FILE: &str = "teacher_public.pem";

#[derive(Parser)]
#[command(name = "focusguard")]
#[command(about = "Signed and encrypted focus reports between student and teacher")]
#[command(version)]
struct Cli {
    /// Data directory holding keys/ and reports/
    #[arg(long, global = true, env = "FOCUSGUARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the teacher RSA keypair
    Keygen {
        /// Output directory for teacher_private.pem / teacher_public.pem
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// RSA modulus size in bits (at least 2048)
        #[arg(long, default_value_t = DEFAULT_RSA_BITS)]
        bits: usize,

        /// Overwrite an existing keypair
        #[arg(long)]
        force: bool,
    },

    /// Decrypt and verify a student report
    Verify {
        /// Teacher private key (PEM)
        #[arg(long)]
        private_key: PathBuf,

        /// Report envelope (JSON)
        #[arg(long)]
        report: PathBuf,

        /// Accept only signers with this SHA-256 public key fingerprint (repeatable)
        #[arg(long = "trusted-signer")]
        trusted_signers: Vec<String>,

        /// Print the verified payload as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import the teacher public key (student side)
    ImportTeacherKey {
        /// Teacher public key (PEM)
        path: PathBuf,
    },

    /// Generate an encrypted report (student side)
    Report {
        /// Completed focus sessions
        #[arg(long)]
        sessions: u64,

        /// Total focus time in minutes
        #[arg(long)]
        focus_minutes: u64,

        /// Total distractions
        #[arg(long)]
        distractions: u64,

        /// Distractions in the last session
        #[arg(long, default_value_t = 0)]
        last_session_distractions: u64,

        /// Encryption mode: hybrid or direct
        #[arg(long)]
        encryption: Option<String>,
    },

    /// Show device keypair and teacher key status
    Status,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Keygen {
            out_dir,
            bits,
            force,
        } => cmd_keygen(&out_dir, bits, force),
        Commands::Verify {
            private_key,
            report,
            trusted_signers,
            json,
        } => cmd_verify(&private_key, &report, &trusted_signers, json),
        Commands::ImportTeacherKey { path } => {
            cmd_import_teacher_key(load_config(cli.data_dir)?, &path)
        }
        Commands::Report {
            sessions,
            focus_minutes,
            distractions,
            last_session_distractions,
            encryption,
        } => {
            let mut config = load_config(cli.data_dir)?;
            if let Some(mode) = encryption {
                config.encryption = parse_encryption(&mode)?;
            }
            let metrics = FocusMetrics {
                timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                sessions_completed: sessions,
                total_focus_minutes: focus_minutes,
                total_distractions: distractions,
                last_session_distractions,
            };
            cmd_report(config, metrics)
        }
        Commands::Status => cmd_status(load_config(cli.data_dir)?),
    }
}

/// 環境変数の設定を読み、`--data-dir` があれば上書きする。
fn load_config(data_dir: Option<PathBuf>) -> anyhow::Result<ReportConfig> {
    let mut config = ReportConfig::from_env()?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

fn cmd_keygen(out_dir: &Path, bits: usize, force: bool) -> anyhow::Result<()> {
    ensure_dir(out_dir)?;
    let private_path = out_dir.join(TEACHER_PRIVATE_KEY_FILE);
    let public_path = out_dir.join(TEACHER_PUBLIC_KEY_FILE);
    if private_path.exists() && !force {
        bail!(
            "{} は既に存在します（上書きする場合は --force）",
            private_path.display()
        );
    }

    tracing::info!(bits, "教師鍵ペアを生成中...");
    let keypair = RsaKeyPair::generate(bits).map_err(ReportError::from)?;
    write_keypair(&keypair, &private_path, &public_path)?;
    let fingerprint = public_key_fingerprint(keypair.public_key()).map_err(ReportError::from)?;

    println!("Generated teacher keypair:");
    println!("  Private key: {}", private_path.display());
    println!("  Public key:  {}", public_path.display());
    println!("  Fingerprint: {fingerprint}");
    println!();
    println!("IMPORTANT:");
    println!("  1. Keep {TEACHER_PRIVATE_KEY_FILE} secret. Never share it.");
    println!("  2. Give {TEACHER_PUBLIC_KEY_FILE} to students.");
    println!("  3. Students import it with `focusguard import-teacher-key`.");
    Ok(())
}

fn cmd_verify(
    private_key: &Path,
    report: &Path,
    trusted_signers: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let keypair = load_keypair_file(private_key)
        .with_context(|| format!("教師秘密鍵 {} を読み込めません", private_key.display()))?;
    let envelope = read_envelope(report).map_err(reject_report)?;

    let mut verifier = EnvelopeVerifier::new(&keypair);
    if !trusted_signers.is_empty() {
        verifier = verifier.with_trusted_signers(trusted_signers);
    }
    let verified = verifier.open_verified(&envelope).map_err(reject_report)?;

    if json {
        let out = serde_json::json!({
            "payload": verified.payload,
            "signer_fingerprint": verified.signer_fingerprint,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", display::format_report(&verified));
    }
    Ok(())
}

/// 完全性エラーには再試行ではなく新しいレポートの依頼を促す文言を付ける。
fn reject_report(err: ReportError) -> anyhow::Error {
    if err.is_terminal() {
        anyhow::Error::new(err)
            .context("このレポートは信頼できません。学生に新しいレポートを依頼してください")
    } else {
        anyhow::Error::new(err)
    }
}

fn cmd_import_teacher_key(config: ReportConfig, path: &Path) -> anyhow::Result<()> {
    let mut service = ReportService::new(config)?;
    let key = service.import_teacher_key_file(path)?;
    println!("Teacher public key imported ({} bits)", key.bits());
    println!("  Fingerprint: {}", key.fingerprint());
    Ok(())
}

fn cmd_report(config: ReportConfig, metrics: FocusMetrics) -> anyhow::Result<()> {
    let service = ReportService::new(config)?;
    let path = match service.generate_report(&metrics.into_payload()) {
        Ok(path) => path,
        Err(ReportError::CounterpartKeyMissing) => {
            bail!("教師の公開鍵が読み込まれていません。先に `focusguard import-teacher-key` を実行してください")
        }
        Err(e) => return Err(e.into()),
    };
    println!("Report written: {}", path.display());
    Ok(())
}

fn cmd_status(config: ReportConfig) -> anyhow::Result<()> {
    let service = ReportService::new(config)?;
    let store = service.key_store();

    println!("Data directory: {}", service.config().data_dir().display());
    match store.device_public_key()? {
        Some(key) => println!(
            "Device keypair: present ({})",
            public_key_fingerprint(&key).map_err(ReportError::from)?
        ),
        None => println!("Device keypair: not generated yet (created on first report)"),
    }
    match store.counterpart_key() {
        Some(key) => println!(
            "Teacher key:    loaded, {} bits ({})",
            key.bits(),
            key.fingerprint()
        ),
        None => println!("Teacher key:    not imported"),
    }
    println!("Encryption:     {}", service.config().encryption.tag());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_verify_with_trusted_signers() {
        let cli = Cli::try_parse_from([
            "focusguard",
            "verify",
            "--private-key",
            "teacher_private.pem",
            "--report",
            "teacher_report.json",
            "--trusted-signer",
            "aa",
            "--trusted-signer",
            "bb",
        ])
        .unwrap();
        match cli.command {
            Commands::Verify {
                trusted_signers,
                json,
                ..
            } => {
                assert_eq!(trusted_signers, ["aa", "bb"]);
                assert!(!json);
            }
            _ => panic!("verifyコマンドとして解釈されていません"),
        }
    }

    /// 必須の集計値が欠けた report コマンドは解釈エラーになることを確認
    #[test]
    fn test_report_requires_metrics() {
        assert!(Cli::try_parse_from(["focusguard", "report", "--sessions", "3"]).is_err());
        let cli = Cli::try_parse_from([
            "focusguard",
            "report",
            "--sessions",
            "3",
            "--focus-minutes",
            "75",
            "--distractions",
            "5",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Report {
                last_session_distractions: 0,
                encryption: None,
                ..
            }
        ));
    }

    /// keygen は既存の秘密鍵を --force なしで上書きしないことを確認
    #[test]
    fn test_keygen_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TEACHER_PRIVATE_KEY_FILE), "existing").unwrap();
        assert!(cmd_keygen(dir.path(), 2048, false).is_err());
        assert_eq!(
            std::fs::read_to_string(dir.path().join(TEACHER_PRIVATE_KEY_FILE)).unwrap(),
            "existing"
        );
    }

    #[test]
    fn test_terminal_errors_get_advice() {
        let err = reject_report(ReportError::SignatureVerification);
        assert!(format!("{err:#}").contains("新しいレポート"));
        let err = reject_report(ReportError::Storage("disk".into()));
        assert!(!format!("{err:#}").contains("新しいレポート"));
    }
}
