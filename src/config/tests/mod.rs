#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use serde_json::{json, Value};
    use tempfile::NamedTempFile;

    use crate::config::parser::{load_config, ConfigError};
    use crate::config::{validate, DataSource, HttpMethod};
    use crate::panel::threshold::Bounds;

    // Helper function to create a temporary file with content
    fn create_temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes()).expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn minimal_panel() -> Value {
        json!({
            "title": "GET Demo",
            "url": { "address": "http://localhost:8080/get", "method": "GET" },
            "fields": [{ "prop": "load", "label": "Load" }]
        })
    }

    fn error_message(raw: Value) -> String {
        validate(&raw).expect_err("config should be rejected").to_string()
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let settings = validate(&minimal_panel()).expect("minimal config is valid");

        assert_eq!(settings.title, "GET Demo");
        assert!(settings.auto_connect);
        assert!(!settings.start_minimized);
        assert!(settings.notifications);
        assert!(!settings.has_thresholds());

        let DataSource::Poll(poll) = &settings.source else {
            panic!("http address should poll");
        };
        assert_eq!(poll.method, HttpMethod::Get);
        assert_eq!(poll.interval, Duration::from_secs(3));
        assert!(poll.form.is_empty());

        let field = settings.field("load").unwrap();
        assert_eq!(field.label, "Load");
        assert!(field.show_lowest && field.show_highest);
        assert!(!field.thresholds.is_configured());
        assert!(settings.field("extra").is_none());
    }

    #[test]
    fn test_interval_floor_is_strict() {
        let with_interval = |interval: f64| {
            let mut raw = minimal_panel();
            raw["url"]["interval"] = json!(interval);
            match validate(&raw).unwrap().source {
                DataSource::Poll(poll) => poll.interval,
                DataSource::Socket(_) => unreachable!(),
            }
        };

        assert_eq!(with_interval(1.0), Duration::from_secs(3));
        assert_eq!(with_interval(3.0), Duration::from_secs(3));
        assert_eq!(with_interval(3.5), Duration::from_millis(3500));
        assert_eq!(with_interval(10.0), Duration::from_secs(10));
    }

    #[test]
    fn test_post_form_values() {
        let settings = validate(&json!({
            "title": "POST Demo",
            "url": {
                "address": "https://localhost/post",
                "method": "post",
                "postData": { "site": "north", "limit": 5, "verbose": true }
            },
            "fields": [{ "prop": "load", "label": "Load" }]
        }))
        .unwrap();

        let DataSource::Poll(poll) = settings.source else {
            panic!("https address should poll");
        };
        assert_eq!(poll.method, HttpMethod::Post);
        assert!(poll.form.contains(&("site".to_string(), "north".to_string())));
        assert!(poll.form.contains(&("limit".to_string(), "5".to_string())));
        assert!(poll.form.contains(&("verbose".to_string(), "true".to_string())));
    }

    #[test]
    fn test_socket_source_defaults() {
        let settings = validate(&json!({
            "title": "Socket Demo",
            "url": { "address": "ws://localhost:8082", "wsGreeting": { "subscribe": "all" } },
            "startMinimized": true,
            "fields": [{
                "prop": "temp",
                "label": "Temperature",
                "highThresholds": { "warn": 80 }
            }]
        }))
        .unwrap();

        assert!(settings.start_minimized);
        assert!(settings.has_thresholds());
        assert_eq!(
            settings.field("temp").unwrap().thresholds.high,
            Some(Bounds {
                warn: Some(80.0),
                danger: None
            })
        );

        let DataSource::Socket(socket) = settings.source else {
            panic!("ws address should use a socket");
        };
        assert_eq!(socket.greeting, Some(json!({ "subscribe": "all" })));
        assert!(socket.is_abnormal(1006));
        assert!(!socket.is_abnormal(1000));
        assert!(!socket.is_abnormal(1001));
    }

    #[test]
    fn test_custom_abnormal_close_codes() {
        let settings = validate(&json!({
            "title": "Socket",
            "url": { "address": "wss://localhost", "abnormalCloseCodes": [1001, 1006, 4000] },
            "fields": []
        }))
        .unwrap();

        let DataSource::Socket(socket) = settings.source else {
            panic!("wss address should use a socket");
        };
        assert!(socket.is_abnormal(1001));
        assert!(socket.is_abnormal(4000));
        assert!(!socket.is_abnormal(1011));
    }

    #[test]
    fn test_missing_and_mistyped_properties() {
        assert_eq!(
            error_message(json!({ "url": { "address": "http://x" }, "fields": [] })),
            "Invalid configuration: title is required"
        );
        assert_eq!(
            error_message(json!({ "title": "T", "url": [], "fields": [] })),
            "Invalid configuration: url must be of type object"
        );
        assert_eq!(
            error_message(json!({
                "title": "T",
                "url": { "address": "http://x" },
                "fields": [
                    { "prop": "a", "label": "A" },
                    { "prop": "b", "label": "B" },
                    { "prop": 3, "label": "C" }
                ]
            })),
            "Invalid configuration: fields[2].prop must be of type string"
        );
        assert_eq!(
            error_message(json!({
                "title": "T",
                "url": { "address": "ws://x", "abnormalCloseCodes": ["1006"] },
                "fields": []
            })),
            "Invalid configuration: url.abnormalCloseCodes[0] must be of type number"
        );
    }

    #[test]
    fn test_rule_violations_are_path_qualified() {
        let err = validate(&json!({
            "title": "T",
            "url": { "address": "ftp://localhost/data" },
            "fields": []
        }))
        .unwrap_err();
        assert_eq!(err.path(), Some("url.address"));

        let err = validate(&json!({
            "title": "T",
            "url": { "address": "http://localhost", "method": "PUT" },
            "fields": []
        }))
        .unwrap_err();
        assert_eq!(err.path(), Some("url.method"));

        let err = validate(&json!({
            "title": "T",
            "url": { "address": "http://localhost", "method": "POST" },
            "fields": []
        }))
        .unwrap_err();
        assert_eq!(err.path(), Some("url.postData"));

        let err = validate(&json!({
            "title": "T",
            "url": { "address": "ws://localhost", "abnormalCloseCodes": [1006, 1000] },
            "fields": []
        }))
        .unwrap_err();
        assert_eq!(err.path(), Some("url.abnormalCloseCodes"));

        let err = validate(&json!({
            "title": "T",
            "url": { "address": "http://localhost" },
            "fields": [
                { "prop": "a", "label": "A" },
                { "prop": "b", "label": "B", "lowThresholds": {} }
            ]
        }))
        .unwrap_err();
        assert_eq!(err.path(), Some("fields[1].lowThresholds"));
        assert!(err.to_string().contains("must define warn, danger or both"));

        let err = validate(&json!({
            "title": "",
            "url": { "address": "http://localhost" },
            "fields": []
        }))
        .unwrap_err();
        assert_eq!(err.path(), Some("title"));
    }

    #[test]
    fn test_duplicate_prop_is_rejected() {
        assert_eq!(
            error_message(json!({
                "title": "T",
                "url": { "address": "http://localhost" },
                "fields": [
                    { "prop": "load", "label": "Load" },
                    { "prop": "load", "label": "Load again" }
                ]
            })),
            "Invalid configuration: fields[1].prop 'load' is already used by another field"
        );
    }

    #[test]
    fn test_load_config_file() {
        let config_yaml = r#"
        metrics:
          enabled: false

        panels:
          - title: GET Demo
            url:
              address: http://localhost:8080/get
              interval: 5
            fields:
              - prop: load
                label: Load
                suffix: "%"
                highThresholds:
                  warn: 70
                  danger: 90
          - title: Socket Demo
            url:
              address: ws://localhost:8082
            autoConnect: false
            fields:
              - prop: rpm
                label: RPM
        "#;

        let temp_file = create_temp_file(config_yaml);
        let config = load_config(temp_file.path()).expect("Failed to load valid config");

        assert!(!config.metrics.enabled);
        assert_eq!(config.panels.len(), 2);
        assert_eq!(config.panels[1]["title"], "Socket Demo");
    }

    #[test]
    fn test_invalid_panel_in_file() {
        let config_yaml = r#"
        panels:
          - title: Fine
            url: { address: "http://localhost" }
            fields: []
          - title: Broken
            url: { address: "http://localhost" }
            fields:
              - prop: load
        "#;

        let temp_file = create_temp_file(config_yaml);
        let err = load_config(temp_file.path()).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Invalid configuration: panels[1].fields[0].label is required"
        );
    }

    #[test]
    fn test_missing_file_and_bad_yaml() {
        let result = load_config("/nonexistent/realtime-monitor.yaml");
        assert!(matches!(result, Err(ConfigError::FileError(_))));

        let temp_file = create_temp_file("panels: [unclosed");
        let result = load_config(temp_file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
