use std::path::{Path, PathBuf};

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use image::ImageFormat;
use regen_protocol::{encode_event, parse_command_line, FrameSource, SessionEvent};
use regen_sim::{dispatch, settle, Frame, Reply, SimulationController};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    /// Directory receiving one PNG per emitted frame.
    pub out_dir: Option<PathBuf>,
    /// Wait out the animation dwell before settling.
    pub honour_dwell: bool,
    pub pretty: bool,
}

/// Feeds command lines to a single session and writes its events as JSON lines.
pub struct ScriptHost {
    controller: SimulationController,
    options: HostOptions,
    frames_written: usize,
}

impl ScriptHost {
    pub fn new(controller: SimulationController, options: HostOptions) -> Self {
        Self {
            controller,
            options,
            frames_written: 0,
        }
    }

    pub fn controller(&self) -> &SimulationController {
        &self.controller
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Executes one script line. Blank lines and `#` comments are skipped.
    pub async fn execute_line<W>(&mut self, line: &str, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }

        let payload = match parse_command_line(trimmed) {
            Ok(payload) => payload,
            Err(err) => {
                debug!(input = trimmed, error = %err, "command.invalid");
                let event = SessionEvent::Error {
                    message: err.to_string(),
                };
                self.write_event(&event, out).await?;
                return out.flush().await.wrap_err("flushing output");
            }
        };

        let reply = dispatch(&mut self.controller, payload);
        let settle_after = reply.settle_after;
        self.write_reply(reply, out).await?;

        if let Some(dwell) = settle_after {
            if self.options.honour_dwell {
                tokio::time::sleep(dwell).await;
            }
            let settled = settle(&mut self.controller);
            self.write_reply(settled, out).await?;
        }
        Ok(())
    }

    async fn write_reply<W>(&mut self, reply: Reply, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        for frame in &reply.frames {
            if let Some(path) = self.save_frame(frame)? {
                info!(path = %path.display(), "frame.saved");
            }
        }
        for event in &reply.events {
            self.write_event(event, out).await?;
        }
        out.flush().await.wrap_err("flushing output")
    }

    async fn write_event<W>(&self, event: &SessionEvent, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let line = if self.options.pretty {
            serde_json::to_string_pretty(event)?
        } else {
            encode_event(event)?
        };
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        Ok(())
    }

    fn save_frame(&mut self, frame: &Frame) -> Result<Option<PathBuf>> {
        let Some(dir) = self.options.out_dir.as_deref() else {
            return Ok(None);
        };
        self.frames_written += 1;
        let path = frame_path(dir, self.frames_written, frame.source);
        frame
            .image
            .save_with_format(&path, ImageFormat::Png)
            .wrap_err_with(|| format!("writing frame to {}", path.display()))?;
        Ok(Some(path))
    }
}

fn frame_path(dir: &Path, index: usize, source: FrameSource) -> PathBuf {
    let label = match source {
        FrameSource::Steady => "steady",
        FrameSource::Animation => "animation",
        FrameSource::Success => "success",
        FrameSource::Failure => "failure",
    };
    dir.join(format!("frame_{index:04}_{label}.png"))
}
