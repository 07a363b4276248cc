use std::path::Path;

use cache_lib::config::Preset;
use cache_lib::memory::driver::CacheHierarchy;
use cache_lib::run_wrapper::{fetch_operations, run_trace};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    let param_tokens: Vec<String> = std::env::args().collect();
    let trace_path =
        param_tokens.get(1).ok_or("You should specify exactly one trace file")?;
    let associativity: usize = match param_tokens.get(2) {
        Some(value) => value.parse()?,
        None => 2,
    };

    let trace_path = Path::new(trace_path);
    let trace_base_name = trace_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or("The trace path has no file name")?;
    std::fs::create_dir_all("eval")?;
    let output_path = format!("eval/multi_eval_{}.csv", trace_base_name);

    let operations = fetch_operations(trace_path)?;

    let mut writer = csv::Writer::from_path(output_path)?;
    writer.write_record([
        "Preset", "Level", "Cache", "Hits", "Misses", "Hit rate", "Miss rate",
        "AMAT",
    ])?;

    for preset in Preset::ALL {
        let mut mem = CacheHierarchy::make(&preset.levels(associativity, false))?;
        let amat = run_trace(&mut mem, &operations)?;

        for (k, level) in mem.levels().iter().enumerate() {
            for (label, cache) in level.caches() {
                writer.write_record([
                    preset.name(),
                    &(k + 1).to_string(),
                    label,
                    &cache.get_hits().to_string(),
                    &cache.get_misses().to_string(),
                    &format!("{:.4}", cache.get_hit_rate()),
                    &format!("{:.4}", cache.get_miss_rate()),
                    &format!("{:.3}", amat),
                ])?;
            }
        }
    }
    writer.flush()?;

    Ok(())
}
