use clap::{Parser, Subcommand};
use clinic_core::{
    seed::seed_demo, CaseSecret, CoreConfig, DocumentSealer, LinkMinter, RecordStore,
    RedemptionService, Verified, Verifier,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic access subsystem CLI")]
struct Cli {
    /// JSON store file operated on by all commands
    #[arg(long, default_value = "clinic.json")]
    data: String,

    /// Public origin used to build shareable URLs
    #[arg(long, default_value = "http://localhost:3000")]
    origin: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plant the demo subject, case and document
    SeedDemo,
    /// Redeem a case code for ephemeral credentials
    RedeemCode {
        /// Case code, e.g. P-DEMO001
        code: String,
    },
    /// Redeem an access-link token for ephemeral credentials
    RedeemLink {
        /// Link token from a shared URL
        token: String,
    },
    /// Mint (or fetch) the shareable access link for a case
    MintLink {
        /// Case UUID
        case_id: Uuid,
    },
    /// Seal a published document, printing its fingerprint
    Seal {
        /// Document UUID
        document_id: Uuid,
    },
    /// Verify a fingerprint or case link token
    Verify {
        /// Fingerprint as scanned or typed
        fingerprint: String,
    },
    /// List all cases in the store
    ListCases,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let store = Arc::new(RecordStore::open(&cli.data)?);
    let cfg = Arc::new(CoreConfig::new(
        cli.origin.as_str(),
        "access.clinic.example",
    )?);

    match cli.command {
        Some(Commands::SeedDemo) => {
            let seed = seed_demo(&store)?;
            println!("Seeded case {} (code {})", seed.case_id, seed.case_code);
            println!("Subject: {}", seed.subject_id);
            println!("Document: {}", seed.document_id);
        }
        Some(Commands::RedeemCode { code }) => {
            let redemption = RedemptionService::new(store, cfg);
            match redemption.redeem(&CaseSecret::Code(code)) {
                Ok(issued) => {
                    println!("Contact: {}", issued.contact);
                    println!("Secret: {}", issued.secret.expose());
                    println!("(The secret is shown once; redeem again to rotate.)");
                }
                Err(e) => eprintln!("Error redeeming code: {}", e),
            }
        }
        Some(Commands::RedeemLink { token }) => {
            let redemption = RedemptionService::new(store, cfg);
            match redemption.redeem(&CaseSecret::LinkToken(token)) {
                Ok(issued) => {
                    println!("Contact: {}", issued.contact);
                    println!("Secret: {}", issued.secret.expose());
                }
                Err(e) => eprintln!("Error redeeming link: {}", e),
            }
        }
        Some(Commands::MintLink { case_id }) => {
            let minter = LinkMinter::new(store, cfg);
            match minter.mint(case_id) {
                Ok(minted) => {
                    println!("Token: {}", minted.token);
                    println!("URL: {}", minted.url);
                }
                Err(e) => eprintln!("Error minting link: {}", e),
            }
        }
        Some(Commands::Seal { document_id }) => {
            let sealer = DocumentSealer::new(store);
            match sealer.seal(document_id) {
                Ok(fingerprint) => println!("Fingerprint: {}", fingerprint),
                Err(e) => eprintln!("Error sealing document: {}", e),
            }
        }
        Some(Commands::Verify { fingerprint }) => {
            let verifier = Verifier::new(store);
            match verifier.verify(&fingerprint) {
                Ok(Verified::Document(doc)) => {
                    println!("Matched document: {} ({})", doc.title, doc.id);
                }
                Ok(Verified::Case(case)) => {
                    println!("Matched case: {} ({})", case.code, case.id);
                }
                Err(e) => eprintln!("Error verifying: {}", e),
            }
        }
        Some(Commands::ListCases) => {
            let cases = store.list_cases()?;
            if cases.is_empty() {
                println!("No cases found.");
            } else {
                for case in cases {
                    println!(
                        "ID: {}, Code: {}, Status: {:?}, Scheduled: {}",
                        case.id, case.code, case.status, case.scheduled_at
                    );
                }
            }
        }
        None => {
            println!("Use 'clinic --help' for commands");
        }
    }

    Ok(())
}
