use anyhow::Result;
use bark_monitor::audio;

/// Device names from `BARK_MONITOR_TEST_DEVICES` (comma separated) when set,
/// otherwise from the audio host.
fn input_device_names() -> Vec<String> {
    if let Ok(raw) = std::env::var("BARK_MONITOR_TEST_DEVICES") {
        return parse_device_list(&raw);
    }
    audio::Recorder::list_devices().unwrap_or_else(|err| {
        eprintln!("Failed to list audio input devices: {err}");
        Vec::new()
    })
}

fn parse_device_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub(crate) fn list_input_devices() -> Result<()> {
    let devices = input_device_names();
    if devices.is_empty() {
        println!("No audio input devices detected.");
    } else {
        println!("Available audio input devices:");
        for name in devices {
            println!("  - {name}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_device_list_skips_blanks() {
        assert_eq!(
            parse_device_list(" USB Mic , ,Built-in "),
            vec!["USB Mic".to_string(), "Built-in".to_string()]
        );
        assert!(parse_device_list("  ").is_empty());
    }
}
