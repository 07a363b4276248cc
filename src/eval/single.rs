use std::path::Path;

use cache_lib::config::Preset;
use cache_lib::memory::driver::CacheHierarchy;
use cache_lib::run_wrapper::{fetch_operations, run_trace};
use log::warn;
use plotters::prelude::{
    ChartBuilder, Color, IntoDrawingArea, IntoFont, LineSeries, Palette,
    Palette99, PathElement, SVGBackend, BLACK, WHITE,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    let param_tokens: Vec<String> = std::env::args().collect();
    let trace_path =
        param_tokens.get(1).ok_or("You should specify exactly one trace file")?;
    let trace_path = Path::new(trace_path);
    let operations = fetch_operations(trace_path)?;

    // Plot line series for each preset
    // For a fixed preset, vary the associativity of the last level
    // Performance metric: AMAT
    let associativities = [1, 2, 4, 8, 16];

    // Propagate the data
    let mut data: Vec<Vec<(usize, f64)>> = vec![vec![]; Preset::ALL.len()];
    let mut y_max: f64 = 0.;
    for (i, preset) in Preset::ALL.iter().enumerate() {
        for associativity in associativities.iter() {
            let mut mem =
                match CacheHierarchy::make(&preset.levels(*associativity, false)) {
                    Ok(mem) => mem,
                    Err(e) => {
                        warn!(
                            "skipping preset {} with associativity {}: {}",
                            preset.name(),
                            associativity,
                            e
                        );
                        continue;
                    }
                };
            let amat = run_trace(&mut mem, &operations)?;
            data[i].push((*associativity, amat));
            y_max = y_max.max(amat);
        }
    }
    // Plot the data
    let trace_base_name = trace_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or("The trace path has no file name")?;
    let plot_title =
        format!("Associativity evaluation (AMAT): {}", trace_base_name);
    std::fs::create_dir_all("eval")?;
    let output_path = format!("eval/assoc_eval_{}.svg", trace_base_name);

    let root =
        SVGBackend::new(output_path.as_str(), (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(plot_title.as_str(), ("sans-serif", 40).into_font())
        .margin(5)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(1..16, 0.0..y_max * 1.1)?;
    ctx.configure_mesh()
        .x_desc("Blocks per set")
        .y_desc("AMAT")
        .draw()?;

    for (i, preset) in Preset::ALL.iter().enumerate() {
        let series = data[i].iter().map(|(x, y)| (*x as i32, *y));
        let label = format!("Preset {}", preset.name());
        let color = Palette99::pick(i).to_rgba();
        ctx.draw_series(LineSeries::new(series, color))?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color)
            });
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;

    Ok(())
}
