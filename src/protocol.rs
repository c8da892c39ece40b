//! Render-description protocol writer
//!
//! Produces the line-oriented textual stream consumed by the renderer
//! process. Each exported node becomes one block:
//!
//! ```text
//! incremental shader "phong1" "maya_phong" (
//!     "color" = "tex1.r",
//!     "diffuse" 0.8000
//! )
//! ```
//!
//! The `incremental` prefix tells the renderer to patch an entity it has
//! already seen instead of recreating it. Writes are buffered and flushed
//! once at pass end.

use crate::config::ExportConfig;
use crate::nodes::Value;
use std::io::{self, BufWriter, Write};

/// Buffered protocol writer over any byte sink
pub struct ProtocolSink<W: Write> {
    out: BufWriter<W>,
    precision: usize,
    first_param: bool,
}

impl<W: Write> ProtocolSink<W> {
    /// Wraps a writer, taking numeric precision from the config
    pub fn new(writer: W, config: &ExportConfig) -> Self {
        Self {
            out: BufWriter::new(writer),
            precision: config.precision,
            first_param: true,
        }
    }

    /// Opens a node block. `declaration` is the implementation token some
    /// kinds carry (shader name, adapter conversion).
    pub fn begin_block(
        &mut self,
        incremental: bool,
        kind: &str,
        identity: &str,
        declaration: Option<&str>,
    ) -> io::Result<()> {
        if incremental {
            self.out.write_all(b"incremental ")?;
        }
        write!(self.out, "{} \"{}\"", kind, identity)?;
        if let Some(declaration) = declaration {
            write!(self.out, " \"{}\"", declaration)?;
        }
        self.out.write_all(b" (")?;
        self.first_param = true;
        Ok(())
    }

    /// Writes one literal parameter line
    pub fn param_value(&mut self, name: &str, value: &Value) -> io::Result<()> {
        self.param_separator()?;
        match value {
            Value::Reference(identity) => {
                write!(self.out, "\"{}\" = \"{}\"", name, identity)
            }
            _ => {
                let formatted = self.format_value(value);
                write!(self.out, "\"{}\" {}", name, formatted)
            }
        }
    }

    /// Writes one parameter line referencing another entity, optionally
    /// selecting a single component of its output
    pub fn param_reference(
        &mut self,
        name: &str,
        identity: &str,
        component: Option<char>,
    ) -> io::Result<()> {
        self.param_separator()?;
        match component {
            Some(component) => write!(self.out, "\"{}\" = \"{}.{}\"", name, identity, component),
            None => write!(self.out, "\"{}\" = \"{}\"", name, identity),
        }
    }

    /// Closes the current node block
    pub fn end_block(&mut self) -> io::Result<()> {
        self.out.write_all(b"\n)\n\n")
    }

    /// Flushes all buffered output to the underlying writer
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Unwraps the sink, flushing buffered output
    pub fn into_inner(self) -> io::Result<W> {
        self.out.into_inner().map_err(|e| e.into_error())
    }

    fn param_separator(&mut self) -> io::Result<()> {
        if self.first_param {
            self.first_param = false;
            self.out.write_all(b"\n    ")
        } else {
            self.out.write_all(b",\n    ")
        }
    }

    fn format_value(&self, value: &Value) -> String {
        let p = self.precision;
        match value {
            Value::Float(v) => format!("{:.*}", p, v),
            Value::Int(v) => v.to_string(),
            Value::Bool(true) => "on".to_string(),
            Value::Bool(false) => "off".to_string(),
            Value::Vec2(v) => format!("{:.p$} {:.p$}", v.x, v.y),
            Value::Vec3(v) => format!("{:.p$} {:.p$} {:.p$}", v.x, v.y, v.z),
            Value::Vec4(v) => format!("{:.p$} {:.p$} {:.p$} {:.p$}", v.x, v.y, v.z, v.w),
            Value::Enum(token) => token.clone(),
            Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Value::Reference(identity) => format!("\"{}\"", identity),
        }
    }
}
