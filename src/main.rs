use clap::Parser;
use plan2dxf::{derive_layout, render, DxfSurface, Plan, PlanKind};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plan2dxf", about = "Survey plan description to layered DXF drawing")]
struct Cli {
    /// Input plan description (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Output DXF path
    #[arg(short, long)]
    output: PathBuf,

    /// Derive the layout and report, without writing a file
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let raw = fs::read_to_string(&cli.input)?;
    let plan: Plan = serde_json::from_str(&raw)?;
    let kind = match &plan.kind {
        PlanKind::Cadastral(_) => "cadastral",
        PlanKind::Topographic(_) => "topographic",
    };

    eprintln!();
    eprintln!("  plan2dxf \u{00b7} {} ({})", plan.core.name, kind);
    eprintln!();

    let layout = derive_layout(&plan)?;
    eprintln!(
        "  Layout      {} primitives \u{00b7} scale 1:{}",
        layout.primitives.len(),
        plan.core.scale
    );
    if let Some(bounds) = layout
        .primitives
        .iter()
        .map(plan2dxf::render::estimated_extent)
        .reduce(|a, b| a.union(b))
    {
        eprintln!(
            "  Bounds      {:.1} \u{00d7} {:.1} drawing units",
            bounds.width(),
            bounds.height()
        );
    }
    if !layout.skipped_ids.is_empty() {
        eprintln!(
            "  Skipped     {} unresolved ids: {}",
            layout.skipped_ids.len(),
            layout.skipped_ids.join(", ")
        );
    }

    if cli.dry_run {
        let mut surface = plan2dxf::RecordingSurface::new();
        render(&layout, &mut surface)?;
        eprintln!("  Dry run     {} placements, nothing written", surface.placed.len());
        eprintln!();
        return Ok(());
    }

    let mut surface = DxfSurface::new();
    render(&layout, &mut surface)?;
    surface.save(&cli.output)?;

    eprintln!("  Entities    {}", surface.entity_count());
    eprintln!();
    eprintln!("  \u{2713} {}", cli.output.display());
    eprintln!();

    Ok(())
}
