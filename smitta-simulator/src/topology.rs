//! Builds the simulated network from run configuration.

use tracing::info;

use smitta_config::SmittaConfig;
use smitta_core::entity::{NodeId, PRIMARY_APP};
use smitta_core::error::SimulationError;
use smitta_core::module::EntityParams;

use crate::apps::{CbrSender, CBR_SENDER, DDOS_SENDER};
use crate::results::VectorRecorder;
use crate::Simulator;

/// Creates a simulator with the sender types registered, the configured
/// destination hosts, and `topology.ue_count` nodes each holding a baseline
/// sender at `app[0]`. Vector recording is enabled when configured.
pub fn build_network(config: &SmittaConfig) -> Result<Simulator, SimulationError> {
    let simulation = &config.simulation;
    let topology = &config.topology;

    let mut sim = Simulator::new(&simulation.network);
    sim.register_type(CBR_SENDER, CbrSender::factory());
    sim.register_type(DDOS_SENDER, CbrSender::ddos_factory());
    for host in &simulation.hosts {
        sim.add_host(host);
    }

    let params = EntityParams {
        traffic: topology.traffic_config()?,
        dest_address: topology.dest_address.clone(),
        start_offset: topology.start_offset()?,
    };
    for node in (0..topology.ue_count).map(NodeId) {
        sim.add_node(node);
        sim.add_entity(node, PRIMARY_APP, &topology.app_type, params.clone())?;
    }

    if simulation.record_vectors {
        let path = simulation
            .result_dir
            .join(&simulation.config_name)
            .join(format!("{}.vec", simulation.run_basename()));
        let run_id = format!("{}-{}", simulation.config_name, simulation.repetition);
        sim.record_vectors(
            VectorRecorder::new(path, run_id)
                .with_attribute("network", &simulation.network)
                .with_attribute("configname", &simulation.config_name)
                .with_attribute("repetition", &simulation.repetition.to_string()),
        );
    }

    info!(
        network = %simulation.network,
        nodes = topology.ue_count,
        app_type = %topology.app_type,
        "Network built"
    );
    Ok(sim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smitta_core::time::SimTime;

    #[test]
    fn builds_one_sender_per_node() {
        let mut config = SmittaConfig::default();
        config.topology.ue_count = 3;
        config.simulation.record_vectors = false;
        let sim = build_network(&config).unwrap();

        let registry = sim.registry();
        assert_eq!(registry.nodes().count(), 3);
        let id = registry.lookup(NodeId(2), PRIMARY_APP).unwrap();
        assert_eq!(sim.path_of(id), "Network.cbrUe[2].app[0]");
        let sender = sim.module::<CbrSender>(id).unwrap();
        assert_eq!(sender.active_config().packet_size, 512);
        assert_eq!(sender.active_config().send_interval, SimTime::from_millis(1_000));
    }

    #[test]
    fn writes_vectors_under_config_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SmittaConfig::default();
        config.topology.ue_count = 1;
        config.simulation.result_dir = dir.path().to_path_buf();
        let mut sim = build_network(&config).unwrap();

        let summary = sim.run(Some(SimTime::from_millis(2_500))).unwrap();
        let expected = dir.path().join("General").join("-repit-0.vec");
        assert_eq!(summary.result_file.as_deref(), Some(expected.as_path()));
        let text = std::fs::read_to_string(expected).unwrap();
        assert!(text.contains("Network.cbrUe[0].app[0] packetSent:vector TV"));
    }

    #[test]
    fn unknown_app_type_is_rejected() {
        let mut config = SmittaConfig::default();
        config.topology.app_type = "UdpBasicApp".into();
        assert!(matches!(
            build_network(&config),
            Err(SimulationError::UnknownEntityType(name)) if name == "UdpBasicApp"
        ));
    }
}
