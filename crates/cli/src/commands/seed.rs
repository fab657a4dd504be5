use crate::commands::{prepare, CommandResult};
use rentdesk_core::VisitDate;
use rentdesk_db::{DemoDataset, SeedResult, VerificationResult};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result: Result<SeedResult, (&'static str, String, u8)> = runtime.block_on(async {
        let store = rentdesk_db::open(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let day = VisitDate::today();

        let seeded = DemoDataset::load(store.as_ref(), day)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoDataset::verify(store.as_ref(), day)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        if verification.all_present {
            Ok(seeded)
        } else {
            Err(("seed_verification", verification_failure_message(&verification), 6u8))
        }
    });

    match result {
        Ok(seeded) => {
            let mut message = summary_message(&seeded);
            if config.database.is_in_memory() {
                message.push_str("\nnote: memory:// does not outlive this command");
            }
            CommandResult::success("seed", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary_message(seeded: &SeedResult) -> String {
    format!(
        "demo dataset loaded:\n  - bookings: {}\n  - reviews: {}\n  - customer notes: {}\n  - visitors on {}: {}",
        seeded.bookings, seeded.reviews, seeded.customer_notes, seeded.visit_date, seeded.visitors
    )
}

fn verification_failure_message(verification: &VerificationResult) -> String {
    let missing = verification.missing();
    if missing.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for records: {}", missing.join(", "))
    }
}
