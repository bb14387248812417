use scene_ngin::app::{ViewerConfig, run};

fn main() -> anyhow::Result<()> {
    run(ViewerConfig::default())
}
