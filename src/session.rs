//! Export session - the driving loop's entry point
//!
//! One session owns the node registry, the progressive ramp and the
//! diagnostics buffer for a single editor scene. The driving loop calls
//! `begin_pass`, then `refresh_and_emit` for each top-level entity, then
//! `end_pass`; everything below that (resolution, adapter synthesis,
//! dependency ordering, write-state bookkeeping) happens inside.
//!
//! Execution is single-threaded and synchronous: a pass runs to completion
//! before control returns, and all calls for one scene must come from one
//! logical thread.

use crate::config::ExportConfig;
use crate::errors::{Diagnostic, ExportError, Result};
use crate::nodes::{
    DependencyEmitter, NodeRegistry, PassContext, ProgressiveController, SampleLevels, Value,
};
use crate::nodes::resolver::OverrideTable;
use crate::protocol::ProtocolSink;
use crate::source::AttributeSource;
use log::{info, warn};
use std::io::Write;

/// Incremental export session for one scene
pub struct ExportSession {
    config: ExportConfig,
    registry: NodeRegistry,
    progressive: ProgressiveController,
    overrides: OverrideTable,
    diagnostics: Vec<Diagnostic>,
    emitter: DependencyEmitter,
    pass: u64,
    /// Set when a sink failure left the renderer's received state unknown;
    /// the next pass starts with a full incremental resync
    needs_resync: bool,
}

impl ExportSession {
    /// Creates a session with the given configuration
    pub fn new(config: ExportConfig) -> Self {
        let progressive = ProgressiveController::new(&config);
        Self {
            config,
            registry: NodeRegistry::new(),
            progressive,
            overrides: OverrideTable::new(),
            diagnostics: Vec::new(),
            emitter: DependencyEmitter::default(),
            pass: 0,
            needs_resync: false,
        }
    }

    /// Starts a new pass. `same_frame` tells refresh that the clock did not
    /// move, letting un-animated written nodes skip their re-read.
    ///
    /// Advances the progressive ramp (its first call keeps the starting
    /// quality) and, after a sink failure, force-invalidates every node so
    /// the renderer is fully resynced.
    pub fn begin_pass(&mut self, same_frame: bool) {
        self.pass += 1;
        if self.needs_resync {
            info!("pass {}: resyncing all nodes after sink failure", self.pass);
            self.registry.invalidate_all();
            self.needs_resync = false;
        }
        if self.config.progressive {
            self.progressive.advance();
        }
        let ctx = PassContext {
            same_frame,
            samples: Some(self.sample_levels()),
        };
        self.emitter = DependencyEmitter::new(ctx);
    }

    /// Refreshes `root` and writes it, preceded by every transitive
    /// producer that needs (re-)emission, to the sink.
    ///
    /// May be called once per top-level entity within a pass; entities
    /// shared between roots are emitted once.
    pub fn refresh_and_emit<W: Write>(
        &mut self,
        root: &str,
        source: &dyn AttributeSource,
        sink: &mut ProtocolSink<W>,
    ) -> Result<()> {
        let result = self.emitter.emit_with_dependencies(
            root,
            &mut self.registry,
            source,
            &self.overrides,
            sink,
            &mut self.diagnostics,
        );
        if let Err(ExportError::Sink(ref e)) = result {
            warn!("pass {}: abandoned, sink write failed: {e}", self.pass);
            self.needs_resync = true;
        }
        result
    }

    /// Ends the pass: flushes the sink and reports whether the progressive
    /// ramp still has refinement passes to run.
    pub fn end_pass<W: Write>(&mut self, sink: &mut ProtocolSink<W>) -> Result<bool> {
        if let Err(e) = sink.flush() {
            warn!("pass {}: sink flush failed: {e}", self.pass);
            self.needs_resync = true;
            return Err(ExportError::Sink(e));
        }
        for diagnostic in &self.diagnostics {
            warn!("pass {}: {diagnostic}", self.pass);
        }
        Ok(self.config.progressive && self.progressive.more_work())
    }

    /// Force-invalidates every node and restarts the progressive ramp.
    /// Called for edits that invalidate accumulated lighting or when cheap
    /// diffing is impossible (scene reload).
    pub fn invalidate_all(&mut self) {
        self.registry.invalidate_all();
        self.progressive.reset(
            self.config.progressive_start_min,
            self.config.progressive_start_max,
        );
    }

    /// Sets an explicit parameter override for one node
    pub fn set_override(&mut self, identity: &str, param: &str, value: Value) {
        self.overrides.set(identity, param, value);
    }

    /// Drops all overrides for one node
    pub fn clear_overrides(&mut self, identity: &str) {
        self.overrides.clear(identity);
    }

    /// Drains the diagnostics recorded since the last call
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Sample counts in effect for the current pass: the ramp's levels in
    /// progressive mode, the configured targets otherwise
    pub fn sample_levels(&self) -> SampleLevels {
        if self.config.progressive {
            self.progressive.levels()
        } else {
            SampleLevels {
                min: self.config.min_samples,
                max: self.config.max_samples,
                collect: self.config.visibility_target,
            }
        }
    }

    /// Fraction of the progressive ramp completed, in (0, 1]
    pub fn percent_complete(&self) -> f32 {
        self.progressive.percent_complete()
    }

    /// The session's node registry
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Mutable access to the node registry
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::value::{Channel, ChannelLayout, Interpretation};
    use crate::nodes::{NodeKind, WriteState};
    use crate::source::testing::{link, TableSource};
    use glam::Vec3;
    use std::io;

    fn sink() -> ProtocolSink<Vec<u8>> {
        ProtocolSink::new(Vec::new(), &ExportConfig::default())
    }

    fn text(sink: ProtocolSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner().unwrap()).unwrap()
    }

    fn rgb() -> Channel {
        Channel::new(ChannelLayout::Vec3, Interpretation::Rgb)
    }

    fn hsv() -> Channel {
        Channel::new(ChannelLayout::Vec3, Interpretation::Hsv)
    }

    /// Writer that rejects every byte, standing in for a broken pipe
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "renderer went away"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "renderer went away"))
        }
    }

    fn shared_network() -> TableSource {
        let mut source = TableSource::new();
        source.add_node("ramp1", NodeKind::Shader, Some("maya_ramp"));
        for consumer in ["c1", "d1"] {
            source.add_node(consumer, NodeKind::Shader, Some("maya_phong"));
            source.set_param(consumer, "color", Value::Vec3(Vec3::ONE));
            source.set_channel(consumer, "color", rgb());
            source.connect(consumer, "color", link("ramp1", "out_hsv", hsv()));
        }
        source
    }

    #[test]
    fn test_shared_subgraph_across_roots_in_one_pass() {
        let source = shared_network();
        let mut session = ExportSession::new(ExportConfig::default());
        let mut out = sink();

        session.begin_pass(false);
        session.refresh_and_emit("c1", &source, &mut out).unwrap();
        session.refresh_and_emit("d1", &source, &mut out).unwrap();
        assert!(!session.end_pass(&mut out).unwrap());

        let stream = text(out);
        assert_eq!(stream.matches("shader \"ramp1\"").count(), 1);
        assert_eq!(stream.matches("adapter \"ramp1>rgb_from_hsv\"").count(), 1);
        let bridge = stream.find("adapter \"ramp1>rgb_from_hsv\"").unwrap();
        assert!(stream.find("shader \"ramp1\"").unwrap() < bridge);
        assert!(bridge < stream.find("shader \"c1\"").unwrap());
        assert!(bridge < stream.find("shader \"d1\"").unwrap());
    }

    #[test]
    fn test_second_pass_writes_nothing_without_edits() {
        let source = shared_network();
        let mut session = ExportSession::new(ExportConfig::default());

        let mut first = sink();
        session.begin_pass(false);
        session.refresh_and_emit("c1", &source, &mut first).unwrap();
        session.end_pass(&mut first).unwrap();
        assert!(!text(first).is_empty());

        let mut second = sink();
        session.begin_pass(true);
        session.refresh_and_emit("c1", &source, &mut second).unwrap();
        session.end_pass(&mut second).unwrap();
        assert!(text(second).is_empty());
    }

    #[test]
    fn test_forced_invalidation_re_emits_unchanged_options() {
        let mut source = TableSource::new();
        source.add_node("renderOptions", NodeKind::Options, None);
        source.set_param("renderOptions", "filter", Value::Enum("gauss".to_string()));

        let mut session = ExportSession::new(ExportConfig::default());
        let mut first = sink();
        session.begin_pass(false);
        session.refresh_and_emit("renderOptions", &source, &mut first).unwrap();
        session.end_pass(&mut first).unwrap();

        // Scene reload: nothing actually changed, but cached state is gone
        session
            .registry_mut()
            .get_mut("renderOptions")
            .unwrap()
            .force_invalidate();

        let mut second = sink();
        session.begin_pass(false);
        session.refresh_and_emit("renderOptions", &source, &mut second).unwrap();
        session.end_pass(&mut second).unwrap();

        let stream = text(second);
        assert!(stream.starts_with("incremental options \"renderOptions\""));
        assert!(stream.contains("\"filter\" gauss"));
        // Injected sample counts are refreshed along with the scene values
        assert!(stream.contains("\"samples max\" 0"));
    }

    #[test]
    fn test_sink_failure_forces_full_resync() {
        let source = shared_network();
        let mut session = ExportSession::new(ExportConfig::default());

        let mut good = sink();
        session.begin_pass(false);
        session.refresh_and_emit("c1", &source, &mut good).unwrap();
        session.end_pass(&mut good).unwrap();
        assert_eq!(
            session.registry().get("c1").unwrap().state(),
            WriteState::Written
        );

        // Renderer pipe breaks mid-session
        let mut broken = ProtocolSink::new(BrokenPipe, &ExportConfig::default());
        session.begin_pass(true);
        session.refresh_and_emit("c1", &source, &mut broken).unwrap();
        assert!(session.end_pass(&mut broken).is_err());

        // The next pass re-emits everything as incremental patches
        let mut recovery = sink();
        session.begin_pass(true);
        session.refresh_and_emit("c1", &source, &mut recovery).unwrap();
        session.end_pass(&mut recovery).unwrap();
        let stream = text(recovery);
        assert!(stream.contains("incremental shader \"c1\""));
        assert!(stream.contains("incremental shader \"ramp1\""));
    }

    #[test]
    fn test_progressive_ramp_drives_options_re_emission() {
        let mut source = TableSource::new();
        source.add_node("renderOptions", NodeKind::Options, None);
        source.set_param("renderOptions", "filter", Value::Enum("box".to_string()));

        let config = ExportConfig {
            progressive: true,
            progressive_start_min: -3,
            progressive_start_max: -3,
            min_samples: -1,
            max_samples: 0,
            ..ExportConfig::default()
        };
        let mut session = ExportSession::new(config);

        let mut first = sink();
        session.begin_pass(false);
        session.refresh_and_emit("renderOptions", &source, &mut first).unwrap();
        let more = session.end_pass(&mut first).unwrap();
        assert!(more);
        let stream = text(first);
        assert!(stream.contains("\"samples max\" -3"));
        assert!(!stream.contains("incremental"));

        // Each refinement pass patches only the options block
        let mut second = sink();
        session.begin_pass(true);
        session.refresh_and_emit("renderOptions", &source, &mut second).unwrap();
        session.end_pass(&mut second).unwrap();
        let stream = text(second);
        assert!(stream.starts_with("incremental options \"renderOptions\""));
        assert!(stream.contains("\"samples max\" -2"));

        // Run the ramp out: -1, then 0, then nothing more
        for expected in ["-1", "0"] {
            let mut out = sink();
            session.begin_pass(true);
            session.refresh_and_emit("renderOptions", &source, &mut out).unwrap();
            session.end_pass(&mut out).unwrap();
            assert!(text(out).contains(&format!("\"samples max\" {expected}")));
        }
        let mut out = sink();
        session.begin_pass(true);
        session.refresh_and_emit("renderOptions", &source, &mut out).unwrap();
        assert!(!session.end_pass(&mut out).unwrap());
        assert!(text(out).is_empty());
    }

    #[test]
    fn test_override_applies_during_refresh() {
        let mut source = TableSource::new();
        source.add_node("lightShape1", NodeKind::Light, Some("maya_spotlight"));
        source.set_param("lightShape1", "intensity", Value::Float(1.0));

        let mut session = ExportSession::new(ExportConfig::default());
        session.set_override("lightShape1", "intensity", Value::Float(2.5));

        let mut out = sink();
        session.begin_pass(false);
        session.refresh_and_emit("lightShape1", &source, &mut out).unwrap();
        session.end_pass(&mut out).unwrap();
        assert!(text(out).contains("\"intensity\" 2.5000"));
    }

    #[test]
    fn test_diagnostics_are_drained() {
        let mut source = TableSource::new();
        source.add_node("phong1", NodeKind::Shader, Some("maya_phong"));
        source.set_param("phong1", "color", Value::Vec3(Vec3::ONE));
        source.connect("phong1", "color", link("ghost", "out", rgb()));

        let mut session = ExportSession::new(ExportConfig::default());
        let mut out = sink();
        session.begin_pass(false);
        session.refresh_and_emit("phong1", &source, &mut out).unwrap();
        session.end_pass(&mut out).unwrap();

        let diagnostics = session.take_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].node, "phong1");
        assert!(session.take_diagnostics().is_empty());
    }
}
