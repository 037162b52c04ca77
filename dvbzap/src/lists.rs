//! Generated channel lists and the PID file.
//!
//! Lists are best effort: a list that cannot be created is skipped with a
//! warning and the streamed-channel feature is turned off.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use dvbzap_conf::channel::{ChannelEntry, Readiness};
use dvbzap_conf::ParameterStore;

/// Paths of the lists generated for one adapter/tuner pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelListPaths {
    pub streamed: PathBuf,
    pub not_streamed: PathBuf,
    pub cam_info: Option<PathBuf>,
}

impl ChannelListPaths {
    pub fn new(run_dir: &Path, card: u32, tuner: u32, cam_support: bool) -> Self {
        let name = |kind: &str| run_dir.join(format!("{}_adapter{}_tuner{}", kind, card, tuner));
        Self {
            streamed: name("channels_streamed"),
            not_streamed: name("channels_unstreamed"),
            cam_info: cam_support.then(|| name("caminfo")),
        }
    }
}

/// Outcome of [`create_lists`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChannelLists {
    /// Files actually created, to be removed at shutdown.
    pub created: Vec<PathBuf>,
    pub write_streamed_channels: bool,
}

fn list_line(channel: &ChannelEntry, default_port: u16) -> String {
    let ip = channel
        .ip4
        .as_deref()
        .or(channel.ip6.as_deref())
        .unwrap_or("0.0.0.0");
    let port = channel.port.unwrap_or(default_port);
    format!("{}:{}:{}\n", ip, port, channel.name)
}

fn write_list<'a>(
    path: &Path,
    channels: impl Iterator<Item = &'a ChannelEntry>,
    default_port: u16,
) -> io::Result<()> {
    let mut file = File::create(path)?;
    for channel in channels {
        file.write_all(list_line(channel, default_port).as_bytes())?;
    }
    file.flush()
}

/// Write the streamed, not-streamed and CAM-info lists for `store`.
pub fn create_lists(paths: &ChannelListPaths, store: &ParameterStore) -> ChannelLists {
    let port = store.multicast.common_port;
    let channels = &store.channels;
    let mut lists = ChannelLists {
        created: Vec::new(),
        write_streamed_channels: true,
    };

    let streamed = channels.iter().filter(|c| c.readiness == Readiness::Ready);
    let not_streamed = channels.iter().filter(|c| c.readiness != Readiness::Ready);
    for (path, result) in [
        (&paths.streamed, write_list(&paths.streamed, streamed, port)),
        (&paths.not_streamed, write_list(&paths.not_streamed, not_streamed, port)),
    ] {
        match result {
            Ok(()) => {
                debug!("Created {}", path.display());
                lists.created.push(path.clone());
            }
            Err(e) => {
                warn!("Can't create {}: {}", path.display(), e);
                lists.write_streamed_channels = false;
            }
        }
    }

    if let Some(path) = &paths.cam_info {
        match File::create(path) {
            Ok(_) => lists.created.push(path.clone()),
            Err(e) => warn!("Can't create {}: {}", path.display(), e),
        }
    }
    lists
}

/// Write the current process id to `path`.
pub fn write_pid_file(path: &Path) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn store_with_channels() -> ParameterStore {
        let mut store = ParameterStore::new();
        let first = store.channels.open_channel().unwrap();
        let entry = store.channels.get_mut(first).unwrap();
        entry.name = "Ready One".to_string();
        entry.ip4 = Some("239.100.0.1".to_string());
        entry.pids = vec![100, 101];
        entry.pids_user_set = true;

        let second = store.channels.open_channel().unwrap();
        let entry = store.channels.get_mut(second).unwrap();
        entry.name = "Waiting".to_string();
        entry.ip4 = Some("239.100.0.2".to_string());
        entry.port = Some(5000);

        store.channels.freeze();
        store
    }

    #[test]
    fn test_paths() {
        let paths = ChannelListPaths::new(Path::new("/run/dvbzap"), 1, 0, false);
        assert_eq!(
            paths.streamed,
            PathBuf::from("/run/dvbzap/channels_streamed_adapter1_tuner0")
        );
        assert_eq!(
            paths.not_streamed,
            PathBuf::from("/run/dvbzap/channels_unstreamed_adapter1_tuner0")
        );
        assert_eq!(paths.cam_info, None);
        assert!(ChannelListPaths::new(Path::new("/run"), 0, 0, true)
            .cam_info
            .is_some());
    }

    #[test]
    fn test_lists_split_by_readiness() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ChannelListPaths::new(dir.path(), 0, 0, true);
        let lists = create_lists(&paths, &store_with_channels());

        assert!(lists.write_streamed_channels);
        assert_eq!(lists.created.len(), 3);
        assert_eq!(
            fs::read_to_string(&paths.streamed).unwrap(),
            "239.100.0.1:1234:Ready One\n"
        );
        assert_eq!(
            fs::read_to_string(&paths.not_streamed).unwrap(),
            "239.100.0.2:5000:Waiting\n"
        );
    }

    #[test]
    fn test_unwritable_dir_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ChannelListPaths::new(&dir.path().join("missing"), 0, 0, false);
        let lists = create_lists(&paths, &ParameterStore::new());
        assert!(!lists.write_streamed_channels);
        assert!(lists.created.is_empty());
    }

    #[test]
    fn test_pid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dvbzap.pid");
        write_pid_file(&path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim(),
            std::process::id().to_string()
        );
    }
}
