//! Output formatting helpers for CLI commands

use crate::config::EndpointConfig;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

/// View model for endpoint display
#[derive(Debug, Clone, serde::Serialize)]
pub struct EndpointRow {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub tls: bool,
    pub verify_tls: bool,
}

impl From<&EndpointConfig> for EndpointRow {
    fn from(config: &EndpointConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.display_name().to_string(),
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            tls: config.use_tls,
            verify_tls: config.verify_tls,
        }
    }
}

/// Format endpoints as a table
pub fn format_endpoints_table(rows: &[EndpointRow]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Name", "Address", "User", "TLS"]);

    for row in rows {
        let tls = match (row.tls, row.verify_tls) {
            (true, true) => "verified".green().to_string(),
            (true, false) => "relaxed".yellow().to_string(),
            (false, _) => "off".red().to_string(),
        };

        table.add_row(vec![
            Cell::new(&row.id),
            Cell::new(&row.name),
            Cell::new(format!("{}:{}", row.host, row.port)),
            Cell::new(&row.username),
            Cell::new(tls),
        ]);
    }

    table.to_string()
}

/// Format endpoints as JSON
pub fn format_endpoints_json(rows: &[EndpointRow]) -> String {
    serde_json::to_string_pretty(&json!({
        "endpoints": rows
    }))
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config() -> EndpointConfig {
        EndpointConfig {
            id: "pve1".to_string(),
            name: Some("Main".to_string()),
            host: "10.0.0.10".to_string(),
            port: 8006,
            username: "root@pam".to_string(),
            password_env: None,
            password: Some(SecretString::new("secret".to_string())),
            use_tls: true,
            verify_tls: false,
        }
    }

    #[test]
    fn test_table_contains_endpoint() {
        let rows = vec![EndpointRow::from(&config())];
        let table = format_endpoints_table(&rows);
        assert!(table.contains("pve1"));
        assert!(table.contains("10.0.0.10:8006"));
    }

    #[test]
    fn test_json_output_excludes_password() {
        let rows = vec![EndpointRow::from(&config())];
        let json = format_endpoints_json(&rows);
        assert!(json.contains("\"id\": \"pve1\""));
        assert!(!json.contains("secret"));
    }
}
