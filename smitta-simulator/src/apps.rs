//! Constant-bit-rate traffic senders.
//!
//! A sender emits one `packetSent` signal per packet, carrying the packet
//! size. It keeps two configurations: the live one, which anyone holding
//! the `TrafficApp` capability may write, and the active one it actually
//! sends with. The active configuration is refreshed from the live one only
//! when an `ApplyConfig` notification arrives on `controlIn`.

use std::any::Any;

use tracing::{debug, trace};

use smitta_core::entity::{NodeId, TrafficApp, TrafficConfig};
use smitta_core::events::{Message, MessageKind};
use smitta_core::module::{EntityParams, Module, ModuleResult, SimContext};
use smitta_core::signal::{SignalId, PACKET_SENT};
use smitta_core::time::SimTime;

use crate::kernel::EntityFactory;

pub const CBR_SENDER: &str = "CbrSender";
pub const DDOS_SENDER: &str = "DDoSSender";

#[derive(Debug)]
pub struct CbrSender {
    type_name: &'static str,
    node: NodeId,
    live: TrafficConfig,
    active: TrafficConfig,
    dest_address: String,
    start_offset: SimTime,
    /// Bumped on every applied reconfiguration; older timers are stale.
    generation: u64,
    packets_sent: u64,
    bytes_sent: u64,
    packet_signal: Option<SignalId>,
}

impl CbrSender {
    pub fn new(node: NodeId, params: &EntityParams) -> Self {
        Self::with_type(CBR_SENDER, node, params)
    }

    /// High-rate attack sender. Same behavior, different registered type.
    pub fn ddos(node: NodeId, params: &EntityParams) -> Self {
        Self::with_type(DDOS_SENDER, node, params)
    }

    fn with_type(type_name: &'static str, node: NodeId, params: &EntityParams) -> Self {
        Self {
            type_name,
            node,
            live: params.traffic,
            active: params.traffic,
            dest_address: params.dest_address.clone(),
            start_offset: params.start_offset,
            generation: 0,
            packets_sent: 0,
            bytes_sent: 0,
            packet_signal: None,
        }
    }

    pub fn factory() -> EntityFactory {
        Box::new(|node, params| Box::new(CbrSender::new(node, params)))
    }

    pub fn ddos_factory() -> EntityFactory {
        Box::new(|node, params| Box::new(CbrSender::ddos(node, params)))
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Configuration packets are currently sent with.
    pub fn active_config(&self) -> TrafficConfig {
        self.active
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    fn schedule_next(&self, ctx: &mut dyn SimContext, delay: SimTime) -> ModuleResult {
        let at = ctx.now().saturating_add(delay);
        ctx.schedule_at(
            at,
            Message::timer(MessageKind::SendTimer {
                generation: self.generation,
            }),
        )?;
        Ok(())
    }

    fn send_packet(&mut self, ctx: &mut dyn SimContext) {
        self.packets_sent += 1;
        self.bytes_sent += u64::from(self.active.packet_size);
        if let Some(signal) = self.packet_signal {
            ctx.emit(signal, i64::from(self.active.packet_size));
        }
        trace!(
            module = ctx.module_path(),
            dest = %self.dest_address,
            bytes = self.active.packet_size,
            "Packet sent"
        );
    }
}

impl Module for CbrSender {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn initialize(&mut self, ctx: &mut dyn SimContext) -> ModuleResult {
        if !ctx.resolve_address(&self.dest_address) {
            return Err(format!("cannot resolve destination address `{}`", self.dest_address).into());
        }
        self.active.validate()?;
        self.packet_signal = Some(ctx.register_signal(PACKET_SENT));
        self.schedule_next(ctx, self.start_offset)
    }

    fn handle_message(&mut self, message: Message, ctx: &mut dyn SimContext) -> ModuleResult {
        match message.kind {
            MessageKind::SendTimer { generation } if generation != self.generation => {
                trace!(generation, current = self.generation, "Stale send timer dropped");
                Ok(())
            }
            MessageKind::SendTimer { .. } => {
                self.send_packet(ctx);
                self.schedule_next(ctx, self.active.send_interval)
            }
            MessageKind::ApplyConfig => {
                self.live.validate()?;
                self.active = self.live;
                self.generation += 1;
                debug!(
                    module = ctx.module_path(),
                    packet_size = self.active.packet_size,
                    send_interval = %self.active.send_interval,
                    "Traffic parameters updated"
                );
                self.schedule_next(ctx, self.active.send_interval)
            }
            other => Err(format!("{} cannot handle {:?}", self.type_name, other).into()),
        }
    }

    fn finish(&mut self, ctx: &mut dyn SimContext) {
        debug!(
            module = ctx.module_path(),
            packets = self.packets_sent,
            bytes = self.bytes_sent,
            "Sender finished"
        );
    }

    fn as_traffic_app(&mut self) -> Option<&mut dyn TrafficApp> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl TrafficApp for CbrSender {
    fn live_config(&self) -> TrafficConfig {
        self.live
    }

    fn set_packet_size(&mut self, bytes: u32) {
        self.live.packet_size = bytes;
    }

    fn set_send_interval(&mut self, interval: SimTime) {
        self.live.send_interval = interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Simulator;

    fn params(packet_size: u32, interval_ms: u64) -> EntityParams {
        EntityParams {
            traffic: TrafficConfig {
                packet_size,
                send_interval: SimTime::from_millis(interval_ms),
            },
            dest_address: "remoteServer".into(),
            start_offset: SimTime::ZERO,
        }
    }

    fn simulator() -> Simulator {
        let mut sim = Simulator::new("X");
        sim.register_type(CBR_SENDER, CbrSender::factory());
        sim.add_host("remoteServer");
        sim.add_node(NodeId(0));
        sim
    }

    #[test]
    fn sends_at_constant_rate() {
        let mut sim = simulator();
        let id = sim
            .add_entity(NodeId(0), "app[0]", CBR_SENDER, params(512, 100))
            .unwrap();
        sim.run(Some(SimTime::from_millis(1_000))).unwrap();

        let sender = sim.module::<CbrSender>(id).unwrap();
        // t = 0, 0.1, ..., 1.0
        assert_eq!(sender.packets_sent(), 11);
        assert_eq!(sender.bytes_sent(), 11 * 512);
    }

    #[test]
    fn live_writes_take_effect_only_after_notification() {
        let mut sender = CbrSender::new(NodeId(0), &params(512, 100));
        sender.apply_config(TrafficConfig {
            packet_size: 4096,
            send_interval: SimTime::from_millis(1),
        });
        assert_eq!(sender.live_config().packet_size, 4096);
        assert_eq!(sender.active_config().packet_size, 512);
        assert_eq!(sender.generation(), 0);
    }

    #[test]
    fn unresolvable_destination_fails_initialization() {
        let mut sim = Simulator::new("X");
        sim.register_type(DDOS_SENDER, CbrSender::ddos_factory());
        sim.add_node(NodeId(0));
        sim.add_entity(NodeId(0), "ddosApp", DDOS_SENDER, params(4096, 1))
            .unwrap();

        let err = sim.initialize().unwrap_err();
        assert!(err.to_string().contains("ddosApp"));
    }
}
