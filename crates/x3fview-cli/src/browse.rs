//! Line-driven browsing session.
//!
//! Each input line is one viewer action (`next`, `rotate`, `zoom`, ...). The
//! loader decodes on its own thread; the loop waits for the current ticket
//! and reports where the image would be drawn.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use x3fview_core::decode::PreviewDecoder;
use x3fview_core::services::ExportKind;
use x3fview_core::session::{Layout, LoadTicket, SessionError, SessionState};
use x3fview_core::{parse_viewport, PreviewLoader, ViewerConfig};

use crate::library::{ExportOutcome, FsLibrary};

const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

const HELP: &str = "\
commands:
  n | next          show the next file
  p | prev          show the previous file
  r | rotate        rotate a quarter turn clockwise
  z | zoom          toggle fit / 1:1
  pan DX DY         drag by DX,DY pointer pixels (1:1 only)
  size WxH          resize the viewport
  d | delete        move the file to the quarantine directory
  e | export        write the embedded JPEG to the export directory
  dng | tiff        queue a converter job
  refresh           rescan the directory
  q | quit";

pub struct Browser {
    session: SessionState,
    loader: PreviewLoader,
    library: FsLibrary,
    /// Dimensions of the currently shown preview, before rotation.
    shown: Option<(u32, u32)>,
}

impl Browser {
    pub fn new(
        library: FsLibrary,
        config: &ViewerConfig,
        viewport: (i32, i32),
        decoder: Arc<dyn PreviewDecoder>,
    ) -> Result<Self> {
        let files = library.scan()?;
        if files.is_empty() {
            bail!(
                "no .{} files in {}",
                config.extension,
                library.root().display()
            );
        }
        log::info!("Browsing {} files with the {} decoder", files.len(), decoder.name());
        Ok(Self {
            session: SessionState::new(files, viewport).with_drag_factor(config.drag_factor),
            loader: PreviewLoader::spawn(decoder)?,
            library,
            shown: None,
        })
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Run until `quit` or end of input.
    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write) -> Result<()> {
        if let Some(ticket) = self.session.current_ticket() {
            self.load(ticket, out)?;
        }
        for line in input.lines() {
            let line = line?;
            if !self.handle(line.trim(), out)? {
                break;
            }
        }
        Ok(())
    }

    /// Apply one command. Returns `false` to stop.
    pub fn handle(&mut self, line: &str, out: &mut impl Write) -> Result<bool> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(true);
        };

        match command {
            "q" | "quit" => return Ok(false),
            "n" | "next" => {
                let ticket = self.session.next();
                self.navigate(ticket, out)?;
            }
            "p" | "prev" => {
                let ticket = self.session.previous();
                self.navigate(ticket, out)?;
            }
            "r" | "rotate" => {
                let quarters = self.session.rotate();
                writeln!(out, "rotation {}°", u32::from(quarters) * 90)?;
                self.show_layout(out)?;
            }
            "z" | "zoom" => {
                let mode = self.session.toggle_zoom();
                writeln!(out, "zoom {:?}", mode)?;
                self.show_layout(out)?;
            }
            "pan" => {
                let (Some(dx), Some(dy)) = (words.next(), words.next()) else {
                    writeln!(out, "usage: pan DX DY")?;
                    return Ok(true);
                };
                match (dx.parse::<f64>(), dy.parse::<f64>()) {
                    (Ok(dx), Ok(dy)) => {
                        if self.session.pan(dx, dy) {
                            self.show_layout(out)?;
                        } else {
                            writeln!(out, "pan ignored in fit mode")?;
                        }
                    }
                    _ => writeln!(out, "usage: pan DX DY")?,
                }
            }
            "size" => match words.next().map(parse_viewport) {
                Some(Ok((w, h))) => {
                    self.session.resize(w, h);
                    self.show_layout(out)?;
                }
                Some(Err(e)) => writeln!(out, "{}", e)?,
                None => writeln!(out, "usage: size WxH")?,
            },
            "d" | "delete" => {
                let ticket = self.session.delete(&mut self.library);
                self.navigate(ticket, out)?;
            }
            "e" | "export" => {
                if let Some(path) = self.current() {
                    match self.library.export_preview(&path) {
                        Ok(ExportOutcome::Written(target)) => {
                            writeln!(out, "exported {}", target.display())?
                        }
                        Ok(ExportOutcome::Skipped(target)) => {
                            writeln!(out, "{} exists, skipped", target.display())?
                        }
                        Err(e) => writeln!(out, "export failed: {:#}", e)?,
                    }
                }
            }
            "dng" | "tiff" => {
                if let (Some(path), Ok(kind)) = (self.current(), command.parse::<ExportKind>()) {
                    match self.library.queue_export(&path, kind) {
                        Ok(job) => write!(out, "queued {}", job.to_line())?,
                        Err(e) => writeln!(out, "queue failed: {:#}", e)?,
                    }
                }
            }
            "refresh" => {
                let files = self.library.scan()?;
                match self.session.refresh(files) {
                    Some(ticket) => self.load(ticket, out)?,
                    None if self.session.is_empty() => {
                        self.shown = None;
                        writeln!(out, "no files left")?
                    }
                    None => writeln!(out, "{} files", self.session.len())?,
                }
            }
            "h" | "help" | "?" => writeln!(out, "{}", HELP)?,
            other => writeln!(out, "unknown command '{}', try help", other)?,
        }
        Ok(true)
    }

    fn current(&self) -> Option<PathBuf> {
        self.session.current_path().map(|p| p.to_path_buf())
    }

    fn navigate(&mut self, ticket: Result<LoadTicket, SessionError>, out: &mut impl Write) -> Result<()> {
        match ticket {
            Ok(ticket) => self.load(ticket, out),
            Err(SessionError::EmptyList) => {
                self.shown = None;
                writeln!(out, "no files left")?;
                Ok(())
            }
            Err(e) => {
                writeln!(out, "{}", e)?;
                Ok(())
            }
        }
    }

    /// Hand the ticket to the worker and wait for its result, dropping any
    /// stale results that arrive first.
    fn load(&mut self, ticket: LoadTicket, out: &mut impl Write) -> Result<()> {
        writeln!(
            out,
            "[{}/{}] {}",
            self.session.current_index() + 1,
            self.session.len(),
            ticket.path.display()
        )?;
        self.shown = None;
        if !self.loader.request(ticket.clone()) {
            bail!("preview loader stopped");
        }

        loop {
            let Some(result) = self.loader.recv_timeout(LOAD_TIMEOUT) else {
                writeln!(out, "timed out loading {}", ticket.path.display())?;
                return Ok(());
            };
            if !self.session.is_current(&result.ticket) {
                log::debug!("Discarding stale result for {}", result.ticket.path.display());
                continue;
            }
            match result.outcome {
                Ok(preview) => {
                    self.shown = Some((preview.image.width, preview.image.height));
                    writeln!(
                        out,
                        "preview {}x{} ({} bytes at {})",
                        preview.image.width,
                        preview.image.height,
                        preview.locator.size,
                        preview.locator.offset
                    )?;
                    self.show_layout(out)?;
                }
                // The session stays usable; only this file has no image
                Err(e) => writeln!(out, "cannot show {}: {}", ticket.path.display(), e)?,
            }
            return Ok(());
        }
    }

    fn show_layout(&mut self, out: &mut impl Write) -> Result<()> {
        let Some((width, height)) = self.shown else {
            return Ok(());
        };
        match self.session.layout(width, height) {
            Ok(Layout::Fit(fit)) => writeln!(
                out,
                "fit {}x{} at ({:.1}, {:.1}) scale {:.4}",
                fit.scaled_width, fit.scaled_height, fit.offset_x, fit.offset_y, fit.scale
            )?,
            Ok(Layout::OneToOne { x, y }) => writeln!(out, "1:1 at ({:.1}, {:.1})", x, y)?,
            Err(e) => writeln!(out, "{}", e)?,
        }
        Ok(())
    }
}
