use crate::error::WcrError;
use crate::extraction::{Document, DocumentKind, LineSpan};
use crate::region::{CropBox, PageSize};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Resolution pdftotext works in when cropping: one pixel per point.
const TEXT_DPI: u32 = 72;

/// Location of the poppler command-line tools.
#[derive(Debug, Clone, Default)]
pub struct PopplerTools {
    bin_dir: Option<PathBuf>,
}

impl PopplerTools {
    /// Tools in `bin_dir`, or on `PATH` when `None`.
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        Self { bin_dir }
    }

    fn command(&self, tool: &str) -> Command {
        match &self.bin_dir {
            Some(dir) => Command::new(dir.join(tool)),
            None => Command::new(tool),
        }
    }

    fn run(&self, tool: &str, args: &[String]) -> Result<Vec<u8>, WcrError> {
        let output = self.command(tool).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WcrError::ToolNotFound {
                    tool: tool.to_string(),
                }
            } else {
                WcrError::Extraction(format!("{tool} failed to start: {e}"))
            }
        })?;

        if !output.status.success() {
            return Err(WcrError::ToolFailed {
                tool: tool.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// A PDF read through poppler (`pdfinfo`, `pdftotext`, `pdftoppm`).
pub struct PopplerDocument {
    name: String,
    path: PathBuf,
    pages: Vec<PageSize>,
    tools: PopplerTools,
    render_dpi: u32,
}

impl PopplerDocument {
    pub fn open(path: &Path, tools: PopplerTools, render_dpi: u32) -> Result<Self, WcrError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let pages = read_page_sizes(&tools, path)?;
        debug!(document = %name, pages = pages.len(), "opened PDF");
        Ok(Self {
            name,
            path: path.to_path_buf(),
            pages,
            tools,
            render_dpi,
        })
    }

    fn page_args(page: usize) -> Vec<String> {
        vec!["-f".into(), page.to_string(), "-l".into(), page.to_string()]
    }
}

impl Document for PopplerDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DocumentKind {
        DocumentKind::Pdf
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> Result<PageSize, WcrError> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .copied()
            .ok_or_else(|| {
                WcrError::RegionOutOfBounds(format!("page {page} is outside '{}'", self.name))
            })
    }

    fn text_in(&self, page: usize, crop: &CropBox) -> Result<Option<String>, WcrError> {
        let (x, y, w, h) = pixel_window(crop, 1.0);
        let mut args = Self::page_args(page);
        args.extend([
            "-r".into(),
            TEXT_DPI.to_string(),
            "-x".into(),
            x.to_string(),
            "-y".into(),
            y.to_string(),
            "-W".into(),
            w.to_string(),
            "-H".into(),
            h.to_string(),
            "-layout".into(),
            self.path.display().to_string(),
            "-".into(),
        ]);
        let stdout = self.tools.run("pdftotext", &args)?;
        let text = String::from_utf8_lossy(&stdout).replace('\x0c', "");
        Ok(Some(text))
    }

    fn line_spans(&self, page: usize) -> Result<Vec<LineSpan>, WcrError> {
        let mut args = Self::page_args(page);
        args.extend([
            "-bbox-layout".into(),
            self.path.display().to_string(),
            "-".into(),
        ]);
        let stdout = self.tools.run("pdftotext", &args)?;
        parse_bbox_xml(&String::from_utf8_lossy(&stdout))
    }

    fn render(&self, page: usize, crop: &CropBox) -> Result<Vec<u8>, WcrError> {
        let scale = f64::from(self.render_dpi) / 72.0;
        let (x, y, w, h) = pixel_window(crop, scale);
        let outdir = tempfile::tempdir()?;
        let prefix = outdir.path().join("region");

        let mut args = Self::page_args(page);
        args.extend([
            "-r".into(),
            self.render_dpi.to_string(),
            "-x".into(),
            x.to_string(),
            "-y".into(),
            y.to_string(),
            "-W".into(),
            w.to_string(),
            "-H".into(),
            h.to_string(),
            "-png".into(),
            "-singlefile".into(),
            self.path.display().to_string(),
            prefix.display().to_string(),
        ]);
        self.tools.run("pdftoppm", &args)?;
        Ok(std::fs::read(prefix.with_extension("png"))?)
    }
}

/// Integer pixel window covering `crop` at `scale` pixels per unit.
fn pixel_window(crop: &CropBox, scale: f64) -> (u64, u64, u64, u64) {
    let x = (crop.x0 * scale).floor().max(0.0) as u64;
    let y = (crop.y0 * scale).floor().max(0.0) as u64;
    let x1 = (crop.x1 * scale).ceil().max(0.0) as u64;
    let y1 = (crop.y1 * scale).ceil().max(0.0) as u64;
    (
        x,
        y,
        x1.saturating_sub(x).max(1),
        y1.saturating_sub(y).max(1),
    )
}

fn read_page_sizes(tools: &PopplerTools, path: &Path) -> Result<Vec<PageSize>, WcrError> {
    // pdfinfo clamps -l to the real page count.
    let args = vec![
        "-f".to_string(),
        "1".to_string(),
        "-l".to_string(),
        "100000".to_string(),
        path.display().to_string(),
    ];
    let stdout = tools.run("pdfinfo", &args)?;
    let sizes = parse_pdfinfo(&String::from_utf8_lossy(&stdout));
    if sizes.is_empty() {
        return Err(WcrError::Extraction(format!(
            "pdfinfo reported no pages for {}",
            path.display()
        )));
    }
    Ok(sizes)
}

/// Parse per-page sizes out of `pdfinfo -f 1 -l N` output.
///
/// Pages rotated by 90 or 270 degrees report their unrotated box, so width
/// and height are swapped to match what pdftotext and pdftoppm see.
fn parse_pdfinfo(text: &str) -> Vec<PageSize> {
    let mut sizes: Vec<(usize, PageSize)> = Vec::new();
    let mut rotations: Vec<(usize, u32)> = Vec::new();

    for line in text.lines() {
        let Some(rest) = line.strip_prefix("Page") else {
            continue;
        };
        let rest = rest.trim_start();
        let Some((num, tail)) = rest.split_once(char::is_whitespace) else {
            continue;
        };
        let Ok(page) = num.parse::<usize>() else {
            continue;
        };
        let tail = tail.trim_start();

        if let Some(dims) = tail.strip_prefix("size:") {
            let mut parts = dims.split_whitespace();
            let width = parts.next().and_then(|w| w.parse::<f64>().ok());
            let _x = parts.next();
            let height = parts.next().and_then(|h| h.parse::<f64>().ok());
            if let (Some(width), Some(height)) = (width, height) {
                sizes.push((page, PageSize { width, height }));
            }
        } else if let Some(rot) = tail.strip_prefix("rot:") {
            if let Ok(r) = rot.trim().parse::<u32>() {
                rotations.push((page, r % 360));
            }
        }
    }

    sizes.sort_by_key(|(page, _)| *page);
    sizes
        .into_iter()
        .map(|(page, size)| {
            let rotated = rotations
                .iter()
                .any(|(p, r)| *p == page && (*r == 90 || *r == 270));
            if rotated {
                PageSize {
                    width: size.height,
                    height: size.width,
                }
            } else {
                size
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
struct Word {
    text: String,
    bbox: CropBox,
}

/// Parse the XHTML produced by `pdftotext -bbox-layout` into line spans.
fn parse_bbox_xml(xml: &str) -> Result<Vec<LineSpan>, WcrError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut line_bbox: Option<CropBox> = None;
    let mut words: Vec<Word> = Vec::new();
    let mut word_bbox: Option<CropBox> = None;
    let mut word_text = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| WcrError::Extraction(format!("unreadable -bbox-layout output: {e}")))?;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"line" => {
                    line_bbox = parse_bbox(&e);
                    words.clear();
                }
                b"word" => {
                    word_bbox = parse_bbox(&e);
                    word_text.clear();
                }
                _ => {}
            },
            Event::Text(t) => {
                if word_bbox.is_some() {
                    let text = t.unescape().map_err(|e| {
                        WcrError::Extraction(format!("unreadable -bbox-layout text: {e}"))
                    })?;
                    word_text.push_str(&text);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"word" => {
                    if let Some(bbox) = word_bbox.take() {
                        let text = word_text.trim();
                        if !text.is_empty() {
                            words.push(Word {
                                text: text.to_string(),
                                bbox,
                            });
                        }
                    }
                }
                b"line" => {
                    if let Some(bbox) = line_bbox.take() {
                        let text = join_words(&words);
                        if !text.is_empty() {
                            out.push(LineSpan {
                                line_index: out.len(),
                                text,
                                bbox,
                            });
                        }
                    }
                    words.clear();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

/// Join words, marking gaps wider than roughly one character height with a
/// run of spaces the way `-layout` output would.
fn join_words(words: &[Word]) -> String {
    let mut text = String::new();
    let mut prev: Option<&Word> = None;
    for word in words {
        if let Some(p) = prev {
            let gap = word.bbox.x0 - p.bbox.x1;
            let height = p.bbox.height().max(1.0);
            if gap > height * 0.9 {
                text.push_str("   ");
            } else {
                text.push(' ');
            }
        }
        text.push_str(&word.text);
        prev = Some(word);
    }
    text
}

fn parse_bbox(tag: &BytesStart<'_>) -> Option<CropBox> {
    Some(CropBox {
        x0: parse_attr_f64(tag, "xMin")?,
        y0: parse_attr_f64(tag, "yMin")?,
        x1: parse_attr_f64(tag, "xMax")?,
        y1: parse_attr_f64(tag, "yMax")?,
    })
}

fn parse_attr_f64(tag: &BytesStart<'_>, name: &str) -> Option<f64> {
    let attr = tag.try_get_attribute(name).ok()??;
    attr.unescape_value().ok()?.parse().ok()
}
