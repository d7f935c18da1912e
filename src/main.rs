use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use query_aux_plot::{fetch_query_aux, plot_or_log, Config, Dataset, QueryParams, QueryValue};

/// Turn `key=value` arguments into query parameters
fn parse_params(args: &[String]) -> Result<QueryParams, String> {
    let mut params = QueryParams::new();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or(format!("Expected key=value, got '{}'", arg))?;
        if key.is_empty() {
            return Err(format!("Empty parameter name in '{}'", arg));
        }
        params.push(key, QueryValue::infer(value));
    }
    Ok(params)
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env()
            .add_directive("query_aux_plot=debug".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap()))
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let params = match parse_params(&args) {
        Ok(p) => p,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    info!("Fetching {}", config.base_url);
    let params = (!params.is_empty()).then_some(params);
    let payload = match fetch_query_aux(&config.base_url, params.as_ref(), config.timeout).await {
        Ok(p) => p,
        Err(e) => {
            error!("Fetch failed: {}", e);
            return;
        }
    };

    let Some(plot_config) = config.plot else {
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to format payload: {}", e),
        }
        return;
    };

    let dataset = match Dataset::from_json(&payload) {
        Ok(d) => d,
        Err(e) => {
            error!("Payload is not tabular: {}", e);
            return;
        }
    };
    info!("Fetched {} rows", dataset.row_count());

    let output_path = config.output_dir.join(format!(
        "{}_over_{}.png",
        file_stem(&plot_config.y1_column),
        file_stem(&plot_config.x_column)
    ));

    if plot_or_log(
        &dataset,
        &plot_config.x_column,
        &plot_config.y1_column,
        plot_config.y2_column.as_deref(),
        plot_config.start.as_deref(),
        plot_config.end.as_deref(),
        &output_path,
    )
    .is_none()
    {
        warn!("No chart was produced");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        let args = vec!["planta=L2".to_string(), "dias=7".to_string()];

        let params = parse_params(&args).unwrap();

        assert_eq!(
            params,
            QueryParams::new().with("planta", "L2").with("dias", 7i64)
        );
        assert!(parse_params(&["oops".to_string()]).is_err());
        assert!(parse_params(&["=1".to_string()]).is_err());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Flujo (m3/h)"), "Flujo__m3_h_");
    }
}
