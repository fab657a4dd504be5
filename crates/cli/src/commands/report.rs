use crate::commands::{prepare, CommandResult};
use rentdesk_agent::ReportBuilder;

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("report") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result: Result<String, (&'static str, String, u8)> = runtime.block_on(async {
        let store = rentdesk_db::open(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        ReportBuilder::new(store)
            .try_build()
            .await
            .map(|report| report.render())
            .map_err(|error| ("store_unavailable", error.to_string(), 5u8))
    });

    match result {
        Ok(rendered) => CommandResult::success("report", rendered),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("report", error_class, message, exit_code)
        }
    }
}
