use std::env::set_var;

use env_logger::init;
use log::info;
use structopt::StructOpt;

use txroomlib::bytes::{ByteBuffer, BytePool, PacketBuffer};
use txroomlib::planner::{plan, plan_and_grow, Requirement, PLANNER_CONFIG};
use txroomlib::utils::parse_str_env;
use txroomlib::DynResult;


const DEFAULT_LOG_LEVEL: &str = "INFO";


#[derive(StructOpt, Debug)]
#[structopt()]
struct Opt {
    /// Initial headroom of the buffer
    #[structopt(long, default_value = "0")]
    headroom: usize,

    /// Payload length of the buffer
    #[structopt(long, default_value = "64")]
    payload: usize,

    /// Initial tailroom of the buffer
    #[structopt(long, default_value = "0")]
    tailroom: usize,

    /// Keep a second owner of the buffer alive while planning
    #[structopt(long)]
    shared: bool,

    /// Bytes at the start of the allocation privately owned by the planned handle
    #[structopt(long, default_value = "0")]
    private_head: usize,

    /// Header bytes written right after planning
    #[structopt(long, default_value = "0")]
    header_need: usize,

    /// Header bytes reserved for later stages
    #[structopt(long, default_value = "0")]
    header_extra: usize,

    /// Reserve room for an authentication tag
    #[structopt(long)]
    tail: bool,

    /// Plan for a monitor duplicate instead of a transmitted frame
    #[structopt(long)]
    monitor: bool,

    /// Maximum bytes the allocator may lease
    #[structopt(long)]
    budget: Option<usize>,

    /// Print txroom version number and exit
    #[structopt(short = "v", long)]
    version: bool
}


fn init_logging() -> DynResult<()> {
    let default_level = parse_str_env("RUST_LOG", Some(DEFAULT_LOG_LEVEL))?;
    set_var("RUST_LOG", parse_str_env("TXROOM_LOG_LEVEL", Some(&default_level))?);
    init();
    Ok(())
}


fn main() -> DynResult<()> {
    init_logging()?;
    let opt = Opt::from_args();
    if opt.version {
        println!("Txroom planner version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let pool = BytePool::new(opt.headroom, opt.payload, opt.tailroom, 0);
    let pool = match opt.budget {
        Some(res) => pool.with_budget(res),
        None => pool
    };
    let mut buffer: ByteBuffer = pool.allocate(opt.payload)?;
    buffer.declare_private_head(opt.private_head);
    let sibling = if opt.shared { Some(buffer.share()) } else { None };

    let requirement = if opt.monitor { Requirement::MonitorOnly } else { Requirement::primary(opt.header_need, opt.header_extra, opt.tail) };
    let config = *PLANNER_CONFIG;
    let targets = requirement.targets(&config)?;
    info!("Planning {requirement:?} with {config:?}: targets {targets:?}, decision {:?}", plan(&buffer, &targets));

    let (identity, allocations) = (buffer.identity(), pool.allocations());
    println!("before: headroom {}, tailroom {}, shared {}", buffer.headroom(), buffer.tailroom(), buffer.is_shared());
    plan_and_grow(&mut buffer, &requirement, &config)?;
    println!("after: headroom {}, tailroom {}, shared {}", buffer.headroom(), buffer.tailroom(), buffer.is_shared());
    println!("identity changed: {}, allocations: {}", buffer.identity() != identity, pool.allocations() - allocations);

    drop(sibling);
    Ok(())
}
