//! Download of resolved streams into the local archive directory.
//!
//! Direct audio URLs are streamed to a `.temp` file next to their final
//! name and then converted to MP3 by an external encoder. HLS playlists
//! are reduced to their best variant, which the encoder reads directly.
//! Every download leaves a `{stem}_metadata.json` sidecar behind.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use chrono::{DateTime, NaiveDate, Utc};
use futures::StreamExt;
use gpa_types::{ProgramId, ResolvedStream};
use reqwest::Client;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::fetch::PageFetcher;
use crate::program::ProgramInfo;
use crate::resolver::StreamResolver;

const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "m4a", "wav"];

/// External MP3 encoder (`ffmpeg`).
#[derive(Clone, Debug)]
pub struct Transcoder {
    program: PathBuf,
}

impl Default for Transcoder {
    /// `ffmpeg` as found on `PATH`, or the bare name if it is not there.
    fn default() -> Self {
        Self::new(which::which("ffmpeg").unwrap_or_else(|_| PathBuf::from("ffmpeg")))
    }
}

impl Transcoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate `ffmpeg` on `PATH`, failing if it is not installed.
    pub fn locate() -> ResolverResult<Self> {
        which::which("ffmpeg")
            .map(Self::new)
            .map_err(|e| ResolverError::TranscodeFailed(format!("ffmpeg not found: {e}")))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Encode `input` (a file path or URL) to 320 kbit/s, 44.1 kHz MP3 at `output`.
    pub async fn transcode(&self, input: &str, output: &Path) -> ResolverResult<()> {
        debug!(encoder = %self.program.display(), input, output = %output.display(), "transcoding");
        let result = Command::new(&self.program)
            .args(["-i", input, "-vn", "-acodec", "libmp3lame", "-b:a", "320k", "-ar", "44100"])
            .arg(output)
            .arg("-y")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                ResolverError::TranscodeFailed(format!("{}: {e}", self.program.display()))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(ResolverError::TranscodeFailed(format!(
                "encoder exited with {}: {}",
                result.status, last
            )));
        }
        Ok(())
    }
}

/// Result of a completed download.
#[derive(Debug, Serialize)]
pub struct DownloadOutcome {
    pub audio_file: PathBuf,
    pub metadata_file: PathBuf,
    pub info: ProgramInfo,
    pub stream: ResolvedStream,
}

/// An audio file present in the archive directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArchivedShow {
    pub name: String,
    pub size: u64,
}

impl ArchivedShow {
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar<'a> {
    #[serde(flatten)]
    info: &'a ProgramInfo,
    program_id: &'a ProgramId,
    download_date: DateTime<Utc>,
    stream_url: &'a str,
    filename: &'a str,
}

/// Writes downloaded shows into an archive directory.
#[derive(Clone, Debug)]
pub struct Archiver {
    archive_dir: PathBuf,
    client: Client,
    transcoder: Transcoder,
}

impl Archiver {
    pub fn new(archive_dir: impl Into<PathBuf>, client: Client) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            client,
            transcoder: Transcoder::default(),
        }
    }

    /// Archiver using the configured directory, user agent and proxy.
    ///
    /// Only connecting is bounded by the configured timeout; bodies of
    /// multi-hour shows take as long as they take.
    pub fn from_config(config: &ResolverConfig) -> ResolverResult<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.timeout());
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ResolverError::Config(format!("proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| ResolverError::Config(e.to_string()))?;
        Ok(Self::new(&config.archive_dir, client))
    }

    pub fn with_transcoder(mut self, transcoder: Transcoder) -> Self {
        self.transcoder = transcoder;
        self
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Resolve, download and convert a program, then write its sidecar.
    pub async fn download<F: PageFetcher>(
        &self,
        resolver: &StreamResolver<F>,
        program_url: &str,
        filename: Option<&str>,
    ) -> ResolverResult<DownloadOutcome> {
        if let Some(name) = filename {
            check_filename(name)?;
        }
        let (stream, info) = resolver.resolve_with_info(program_url).await?;
        let program_id = &stream.program_id;

        let filename = match filename {
            Some(name) => name.to_string(),
            None => default_filename(&info.title, program_id, Utc::now().date_naive()),
        };
        tokio::fs::create_dir_all(&self.archive_dir).await?;

        let audio_file = if stream.is_hls() {
            let variant = resolver.resolve_playlist(&stream.url).await?;
            let output = self.archive_dir.join(mp3_name(&filename));
            self.transcoder.transcode(&variant, &output).await?;
            output
        } else {
            let temp = self.archive_dir.join(temp_name(&filename));
            self.fetch_to_file(&stream.url, &temp).await?;
            self.finalize(&temp, &filename).await?
        };

        let metadata_file = self.archive_dir.join(metadata_name(&filename));
        let sidecar = Sidecar {
            info: &info,
            program_id,
            download_date: Utc::now(),
            stream_url: &stream.url,
            filename: &filename,
        };
        let json = serde_json::to_vec_pretty(&sidecar).map_err(std::io::Error::from)?;
        tokio::fs::write(&metadata_file, json).await?;

        info!(file = %audio_file.display(), title = %info.title, "download complete");
        Ok(DownloadOutcome {
            audio_file,
            metadata_file,
            info,
            stream,
        })
    }

    /// Stream a response body to `dest` chunk by chunk.
    async fn fetch_to_file(&self, url: &str, dest: &Path) -> ResolverResult<u64> {
        info!(url, dest = %dest.display(), "downloading");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ResolverError::fetch(url, e))?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut body = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ResolverError::fetch(url, e))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!(bytes = written, "body written");
        Ok(written)
    }

    /// Turn a downloaded temp file into the final MP3.
    ///
    /// If the encoder fails the temp file is kept under its final
    /// extension-preserving name and the failure is returned.
    pub async fn finalize(&self, temp: &Path, filename: &str) -> ResolverResult<PathBuf> {
        let output = self.archive_dir.join(mp3_name(filename));
        let temp_str = temp.to_string_lossy();

        if temp_str.ends_with(".temp.mp3") && filename.ends_with(".mp3") {
            tokio::fs::rename(temp, &output).await?;
            return Ok(output);
        }

        match self.transcoder.transcode(&temp_str, &output).await {
            Ok(()) => {
                tokio::fs::remove_file(temp).await?;
                Ok(output)
            }
            Err(e) => {
                let name = temp.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                let kept = temp.with_file_name(name.replacen(".temp", "", 1));
                if tokio::fs::try_exists(temp).await.unwrap_or(false) {
                    tokio::fs::rename(temp, &kept).await?;
                    warn!(kept = %kept.display(), "conversion failed, kept original");
                }
                Err(e)
            }
        }
    }

    /// Audio files in the archive directory, by name.
    pub async fn list_archived(&self) -> ResolverResult<Vec<ArchivedShow>> {
        let mut entries = match tokio::fs::read_dir(&self.archive_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut shows = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_audio = Path::new(&name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| AUDIO_EXTENSIONS.contains(&e));
            if !is_audio {
                continue;
            }
            let md = entry.metadata().await?;
            if md.is_file() {
                shows.push(ArchivedShow { name, size: md.len() });
            }
        }
        shows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(shows)
    }
}

/// Keep ASCII letters, digits and `-`; whitespace runs become `_`.
pub fn safe_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_space = false;
    for c in title.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
                in_space = true;
            }
        } else if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
            in_space = false;
        }
    }
    out
}

pub fn default_filename(title: &str, program_id: &ProgramId, date: NaiveDate) -> String {
    format!("{}_{}_{}.m4a", safe_title(title), program_id, date.format("%Y-%m-%d"))
}

/// A caller-supplied filename must name a plain file inside the archive.
fn check_filename(name: &str) -> ResolverResult<()> {
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !Path::new(name).is_absolute();
    if plain {
        Ok(())
    } else {
        Err(ResolverError::InvalidFilename(name.to_string()))
    }
}

fn split_audio_ext(filename: &str) -> Option<(&str, &str)> {
    filename
        .rsplit_once('.')
        .filter(|(_, ext)| matches!(*ext, "mp3" | "m4a"))
}

/// `show.m4a` -> `show.temp.m4a`
pub fn temp_name(filename: &str) -> String {
    match split_audio_ext(filename) {
        Some((stem, ext)) => format!("{stem}.temp.{ext}"),
        None => format!("{filename}.temp"),
    }
}

fn mp3_name(filename: &str) -> String {
    match split_audio_ext(filename) {
        Some((stem, _)) => format!("{stem}.mp3"),
        None => format!("{filename}.mp3"),
    }
}

fn metadata_name(filename: &str) -> String {
    let stem = split_audio_ext(filename).map_or(filename, |(stem, _)| stem);
    format!("{stem}_metadata.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::SnapshotFetcher;

    fn archiver(dir: &Path) -> Archiver {
        Archiver::new(dir, Client::new())
            .with_transcoder(Transcoder::new("/nonexistent/bin/ffmpeg-gpa"))
    }

    #[test]
    fn safe_titles() {
        assert_eq!(safe_title("Gilles Peterson"), "Gilles_Peterson");
        assert_eq!(safe_title("Jazz & Soul:  Live!"), "Jazz_Soul_Live");
        assert_eq!(safe_title("Late-Night  Mix\t2"), "Late-Night_Mix_2");
        assert_eq!(safe_title("Café"), "Caf");
    }

    #[test]
    fn default_filename_layout() {
        let id = ProgramId::from_url("https://www.bbc.com/audio/play/m002kqfg").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(
            default_filename("Gilles Peterson", &id, date),
            "Gilles_Peterson_m002kqfg_2026-03-07.m4a"
        );
    }

    #[test]
    fn derived_names() {
        assert_eq!(temp_name("show.m4a"), "show.temp.m4a");
        assert_eq!(temp_name("show.mp3"), "show.temp.mp3");
        assert_eq!(temp_name("show"), "show.temp");
        assert_eq!(mp3_name("show.m4a"), "show.mp3");
        assert_eq!(mp3_name("show.aac"), "show.aac.mp3");
        assert_eq!(metadata_name("show.m4a"), "show_metadata.json");
        assert_eq!(metadata_name("show"), "show_metadata.json");
    }

    #[test]
    fn filenames_stay_inside_archive() {
        assert!(check_filename("show.m4a").is_ok());
        assert!(check_filename("2026-01-17 Gilles Peterson.mp3").is_ok());
        for bad in ["", ".", "..", "../x.m4a", "a/b.m4a", "/tmp/x.m4a", "..\\x.m4a"] {
            assert!(matches!(check_filename(bad), Err(ResolverError::InvalidFilename(_))), "{bad}");
        }
    }

    #[tokio::test]
    async fn escaping_filename_is_rejected_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = StreamResolver::new(SnapshotFetcher::new(), ResolverConfig::default());
        let err = archiver(dir.path())
            .download(&resolver, "https://www.bbc.com/audio/play/m002kqfg", Some("../escape.m4a"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::InvalidFilename(_)));
        assert_eq!(resolver.fetcher().request_count(), 0);
        assert!(!dir.path().parent().unwrap().join("escape.m4a").exists());
    }

    #[tokio::test]
    async fn mp3_temp_is_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("show.temp.mp3");
        std::fs::write(&temp, b"ID3").unwrap();
        let out = archiver(dir.path()).finalize(&temp, "show.mp3").await.unwrap();
        assert_eq!(out, dir.path().join("show.mp3"));
        assert!(out.exists());
        assert!(!temp.exists());
    }

    #[tokio::test]
    async fn failed_conversion_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("show.temp.m4a");
        std::fs::write(&temp, b"not really aac").unwrap();
        let err = archiver(dir.path()).finalize(&temp, "show.m4a").await.unwrap_err();
        assert!(matches!(err, ResolverError::TranscodeFailed(_)));
        assert!(!temp.exists());
        assert_eq!(std::fs::read(dir.path().join("show.m4a")).unwrap(), b"not really aac");
    }

    #[tokio::test]
    async fn lists_audio_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.mp3"), vec![0u8; 2048]).unwrap();
        std::fs::write(dir.path().join("a.m4a"), b"x").unwrap();
        std::fs::write(dir.path().join("c.wav"), b"xy").unwrap();
        std::fs::write(dir.path().join("b_metadata.json"), b"{}").unwrap();
        std::fs::create_dir(dir.path().join("sub.mp3")).unwrap();

        let shows = archiver(dir.path()).list_archived().await.unwrap();
        let names: Vec<&str> = shows.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a.m4a", "b.mp3", "c.wav"]);
        assert_eq!(shows[1].size, 2048);
    }

    #[tokio::test]
    async fn missing_archive_dir_lists_nothing() {
        let a = archiver(Path::new("/definitely/not/here/gpa-archive"));
        assert!(a.list_archived().await.unwrap().is_empty());
    }

    #[test]
    fn sidecar_shape() {
        let info = ProgramInfo::unknown("https://www.bbc.com/audio/play/m1");
        let id = ProgramId::from_url(&info.original_url).unwrap();
        let sidecar = Sidecar {
            info: &info,
            program_id: &id,
            download_date: Utc::now(),
            stream_url: "https://cdn/x.mp3",
            filename: "x.m4a",
        };
        let json = serde_json::to_value(&sidecar).unwrap();
        assert_eq!(json["title"], "BBC Audio");
        assert_eq!(json["programId"], "m1");
        assert_eq!(json["streamUrl"], "https://cdn/x.mp3");
        assert!(json.get("downloadDate").is_some());
    }

    #[test]
    fn config_builds_archiver() {
        let archiver = Archiver::from_config(&ResolverConfig::default()).unwrap();
        assert_eq!(archiver.archive_dir(), Path::new("./archive"));
    }
}
