use crate::lookup::ExternalContext;

const BUSINESS_PREAMBLE: &str = "You are the assistant of a game-console rental shop, talking to the owner. \
Answer from the business data below. When the owner asks you to change records, state each \
action on its own line using exactly one of these forms:
change booking <ID> status to <Active|Completed|Cancelled>
delete review <ID>
tag customer <phone> as bargainer
When asked about visitors who didn't book today, include the phrase \"visitors who didn't book\".";

const GENERAL_PREAMBLE: &str =
    "You are a helpful assistant for a game-console rental shop. Answer concisely.";

pub fn business(report: &str, message: &str) -> String {
    format!("{BUSINESS_PREAMBLE}\n\nBusiness data:\n{report}\n\nOwner: {message}")
}

/// General prompt; the context block is left out entirely when there is no context.
pub fn general(context: Option<&ExternalContext>, message: &str) -> String {
    match context {
        Some(context) => format!(
            "{GENERAL_PREAMBLE} Use the context below when it is relevant.\n\nContext:\n{}\n\nQuestion: {message}",
            context.render()
        ),
        None => format!("{GENERAL_PREAMBLE}\n\nQuestion: {message}"),
    }
}
