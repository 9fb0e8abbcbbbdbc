use localise::config::FilterParams;
use serde_json::json;

fn main() {
    let params = FilterParams::default();
    let json = json!(params);
    match serde_json::to_string_pretty(&json) {
        Ok(pretty) => println!("{pretty}"),
        Err(err) => eprintln!("failed to serialize parameters: {err}"),
    }
}
