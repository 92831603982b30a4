use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use glam::Vec3;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use railwrench_action::{
    ActionContext, ActionOutcome, ActivateEvent, Diagnostics, DiagnosticsLog, TracingDiagnostics,
    VehicleGrid, WrenchAction, WrenchConfig, find_join_candidate_indexed,
};
use railwrench_common::{BlockPos, ConnectivityMask, EntityId, Location};
use railwrench_ecs::EntityStore;
use railwrench_kernel::{BlockManager, BlockWorld, FamilyId};
use railwrench_tools::RailInspector;

#[derive(Parser)]
#[command(name = "railwrench-cli", about = "CLI tool for railwrench wrench actions")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON file overriding the wrench configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and active configuration
    Info,
    /// Search for the nearest vehicle a source vehicle could couple with
    Join {
        /// Vehicle positions as x,y,z (repeatable)
        #[arg(short = 'p', long = "vehicle", value_parser = parse_vec3, required = true)]
        vehicles: Vec<Vec3>,
        /// Index of the source vehicle in the position list
        #[arg(short, long, default_value = "0")]
        source: usize,
        /// Override the configured join distance
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Narrow the search with a spatial grid
        #[arg(long)]
        indexed: bool,
    },
    /// Apply the wrench to a single rail segment
    Toggle {
        /// Connectivity mask of the rail (decimal byte)
        #[arg(short, long)]
        mask: u8,
        /// Family the rail starts in
        #[arg(short, long, value_enum, default_value = "normal")]
        family: StartFamily,
        /// Number of times to apply the wrench
        #[arg(short, long, default_value = "1")]
        times: u32,
    },
    /// Run the reference join and toggle scenarios
    Scenarios,
}

#[derive(Clone, Copy, ValueEnum)]
enum StartFamily {
    Normal,
    Inverted,
}

fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected x,y,z, got {s:?}"));
    };
    let coord = |v: &str| v.parse::<f32>().map_err(|e| format!("{v:?}: {e}"));
    Ok(Vec3::new(coord(*x)?, coord(*y)?, coord(*z)?))
}

/// Entity store, block world and registry wired together with a wrench.
struct Sandbox {
    entities: EntityStore,
    world: BlockWorld,
    registry: BlockManager,
    action: WrenchAction,
    wrench: EntityId,
    normal: FamilyId,
    inverted: FamilyId,
}

impl Sandbox {
    fn new(config: &WrenchConfig) -> anyhow::Result<Self> {
        let mut registry = BlockManager::new();
        let all = (0..=u8::MAX).map(ConnectivityMask);
        let normal = registry.register_connection_family(&config.normal_rail_family, all.clone())?;
        let inverted = registry.register_connection_family(
            &config.inverted_rail_family,
            all.filter(|m| m.is_junction()),
        )?;
        let mut entities = EntityStore::new();
        let wrench = entities.spawn();
        entities.add_wrench(wrench);
        Ok(Self {
            entities,
            world: BlockWorld::new(),
            registry,
            action: WrenchAction::new(config),
            wrench,
            normal,
            inverted,
        })
    }

    fn add_vehicle(&mut self, position: Vec3) -> EntityId {
        let id = self.entities.spawn();
        self.entities.add_vehicle(id);
        self.entities.set_location(id, Location::at(position));
        id
    }

    fn add_rail(&mut self, pos: BlockPos, family: FamilyId, mask: ConnectivityMask) -> anyhow::Result<EntityId> {
        let block = self
            .registry
            .family(family)
            .and_then(|f| f.block_by_connection(mask))
            .with_context(|| format!("no rail variant for mask {mask}"))?;
        self.world.set_block(pos, block);
        let id = self.entities.spawn();
        self.entities.add_rail(id);
        self.entities.set_block(id, pos);
        self.world.bind_entity(pos, id);
        Ok(id)
    }

    fn wrench_on(&mut self, target: EntityId, log: Option<&mut DiagnosticsLog>) -> Vec<ActionOutcome> {
        let mut tracing_sink = TracingDiagnostics;
        let mut ctx = ActionContext {
            entities: &self.entities,
            world: &mut self.world,
            registry: &self.registry,
            diagnostics: match log {
                Some(log) => log as &mut dyn Diagnostics,
                None => &mut tracing_sink as &mut dyn Diagnostics,
            },
        };
        self.action.on_activate(
            ActivateEvent {
                instigator: self.wrench,
                target,
            },
            &mut ctx,
        )
    }

    fn describe_block(&self, pos: BlockPos) -> String {
        self.registry
            .block(self.world.block_at(pos))
            .map(|b| b.uri.to_string())
            .unwrap_or_else(|| "<unknown>".into())
    }

    fn print_summary(&self, config: &WrenchConfig) {
        let toggler = railwrench_action::RailOrientationToggler::from_config(config);
        println!(
            "{}",
            RailInspector::summary(&self.entities, &self.world, &self.registry, &toggler)
        );
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<WrenchConfig> {
    match path {
        Some(path) => WrenchConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(WrenchConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
    tracing::debug!("railwrench-cli starting");

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Info => {
            println!("railwrench-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("max vehicle join distance: {}", config.max_vehicle_join_distance);
            println!("normal rail family: {}", config.normal_rail_family);
            println!("inverted rail family: {}", config.inverted_rail_family);
        }
        Commands::Join {
            vehicles,
            source,
            threshold,
            indexed,
        } => {
            let config = WrenchConfig {
                max_vehicle_join_distance: threshold.unwrap_or(config.max_vehicle_join_distance),
                ..config
            };
            config.validate()?;
            anyhow::ensure!(
                source < vehicles.len(),
                "source index {source} out of range for {} vehicles",
                vehicles.len()
            );

            let mut sandbox = Sandbox::new(&config)?;
            let ids: Vec<EntityId> = vehicles.iter().map(|p| sandbox.add_vehicle(*p)).collect();
            let source_id = ids[source];

            let candidate = if indexed {
                let mut grid = VehicleGrid::new(config.max_vehicle_join_distance);
                grid.rebuild(&sandbox.entities)?;
                let location = Location::at(vehicles[source]);
                find_join_candidate_indexed(
                    &grid,
                    &sandbox.entities,
                    source_id,
                    &location,
                    config.max_vehicle_join_distance,
                )?
            } else {
                match sandbox.wrench_on(source_id, None).as_slice() {
                    [ActionOutcome::JoinSearch { candidate, .. }] => *candidate,
                    other => anyhow::bail!("unexpected wrench outcome: {other:?}"),
                }
            };

            match candidate.and_then(|c| ids.iter().position(|id| *id == c)) {
                Some(index) => println!(
                    "vehicle {source} joins vehicle {index} at {}",
                    vehicles[index]
                ),
                None => println!("vehicle {source} has no joinable vehicle"),
            }
        }
        Commands::Toggle { mask, family, times } => {
            let mut sandbox = Sandbox::new(&config)?;
            let family = match family {
                StartFamily::Normal => sandbox.normal,
                StartFamily::Inverted => sandbox.inverted,
            };
            let pos = BlockPos::new(0, 0, 0);
            let rail = sandbox.add_rail(pos, family, ConnectivityMask(mask))?;
            println!("start: {}", sandbox.describe_block(pos));
            for i in 1..=times {
                let outcomes = sandbox.wrench_on(rail, None);
                println!("#{i}: {outcomes:?} -> {}", sandbox.describe_block(pos));
            }
            sandbox.print_summary(&config);
        }
        Commands::Scenarios => run_scenarios(&config)?,
    }

    Ok(())
}

fn run_scenarios(config: &WrenchConfig) -> anyhow::Result<()> {
    let join_config = WrenchConfig {
        max_vehicle_join_distance: 5.0,
        ..config.clone()
    };

    // 1: nearest of two candidates
    let mut sandbox = Sandbox::new(&join_config)?;
    let a = sandbox.add_vehicle(Vec3::ZERO);
    let b = sandbox.add_vehicle(Vec3::new(2.0, 0.0, 0.0));
    sandbox.add_vehicle(Vec3::new(100.0, 0.0, 0.0));
    let mut log = DiagnosticsLog::new();
    let outcomes = sandbox.wrench_on(a, Some(&mut log));
    report("1 nearest vehicle", &outcomes, &log);
    check(
        matches!(outcomes.as_slice(), [ActionOutcome::JoinSearch { candidate: Some(c), .. }] if *c == b),
        "scenario 1",
    )?;

    // 2: lone vehicle
    let mut sandbox = Sandbox::new(&join_config)?;
    let a = sandbox.add_vehicle(Vec3::ZERO);
    let mut log = DiagnosticsLog::new();
    let outcomes = sandbox.wrench_on(a, Some(&mut log));
    report("2 lone vehicle", &outcomes, &log);
    check(
        matches!(outcomes.as_slice(), [ActionOutcome::JoinSearch { candidate: None, .. }]),
        "scenario 2",
    )?;

    // 3 + 5: junction round trip
    let mut sandbox = Sandbox::new(config)?;
    let pos = BlockPos::new(0, 0, 0);
    let rail = sandbox.add_rail(pos, sandbox.normal, ConnectivityMask(7))?;
    let original = sandbox.world.block_at(pos);
    let mut log = DiagnosticsLog::new();
    let outcomes = sandbox.wrench_on(rail, Some(&mut log));
    report("3 normal junction", &outcomes, &log);
    println!("   now {}", sandbox.describe_block(pos));
    let outcomes = sandbox.wrench_on(rail, Some(&mut log));
    report("5 inverted junction", &outcomes, &log);
    println!("   now {}", sandbox.describe_block(pos));
    check(sandbox.world.block_at(pos) == original, "scenario 3+5 round trip")?;

    // 4: straight rail
    let pos = BlockPos::new(1, 0, 0);
    let rail = sandbox.add_rail(pos, sandbox.normal, ConnectivityMask(3))?;
    let before = sandbox.world.block_at(pos);
    let outcomes = sandbox.wrench_on(rail, Some(&mut log));
    report("4 straight rail", &outcomes, &log);
    check(sandbox.world.block_at(pos) == before, "scenario 4")?;

    sandbox.print_summary(config);
    println!("all scenarios passed");
    Ok(())
}

fn report(name: &str, outcomes: &[ActionOutcome], log: &DiagnosticsLog) {
    println!("{name}: {outcomes:?}");
    for message in log.messages() {
        println!("   diagnostic: {message}");
    }
}

fn check(ok: bool, what: &str) -> anyhow::Result<()> {
    anyhow::ensure!(ok, "{what} failed");
    Ok(())
}
