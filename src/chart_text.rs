//! Chart titles and number formatting shared by the demand charts.

use num_format::{Locale, ToFormattedString};

pub const TITLE_WRAP_WIDTH: usize = 145;

pub const NATIONAL_DEMAND_DESCRIPTION: &str = "National Demand is calculated as a sum of \
generation based on National Grid operational generation metering. This is the Great Britain \
generation requirement and is equivalent to the Initial National Demand Outturn (INDO) and \
National Demand Forecast as published on BM Reports. National Demand is the sum of metered \
generation, but excludes generation required to meet station load, pump storage pumping and \
interconnector exports.";

/// Greedy word wrap. Words longer than `width` get a line of their own
/// rather than being split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.len() + 1 + word.len() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Round to a whole number and group thousands: 12345.6 -> "12,346".
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    rounded.to_formatted_string(&Locale::en)
}

/// Display name for an interconnector flow column.
pub fn link_name(column: &str) -> String {
    match column {
        "FRENCH_FLOW" => "French".to_string(),
        "BRITNED_FLOW" => "BritNed".to_string(),
        "MOYLE_FLOW" => "Moyle".to_string(),
        "EAST_WEST_FLOW" => "East-West".to_string(),
        "NEMO_FLOW" => "Nemo".to_string(),
        "IFA2_FLOW" => "IFA2".to_string(),
        "NSL_FLOW" => "North Sea Link".to_string(),
        "ELECLINK_FLOW" => "ElecLink".to_string(),
        "VIKING_FLOW" => "Viking".to_string(),
        "GREENLINK_FLOW" => "Greenlink".to_string(),
        other => other.trim_end_matches("_FLOW").replace('_', " "),
    }
}

pub fn interconnector_description(links: &[String], mean_flow: f64) -> String {
    let names: Vec<String> = links.iter().map(|link| link_name(link)).collect();
    format!(
        "The flow on the interconnectors ({}). -ve signifies export power out from GB; +ve \
         signifies import power into GB. Mean flow is {}MW into GB.",
        names.join(", "),
        format_thousands(mean_flow)
    )
}
