//! Directives owned by the orchestrator itself: channel blocks, engine
//! switches and the PID file location.

use log::{info, warn};

use super::{parse_value, path_value, truncate_utf8, ParseContext, Recognized, SectionParser};
use crate::channel::{MAX_NAME_LEN, MAX_PIDS, PID_MAX, PID_MIN, PMT_PID_MAX};
use crate::error::ConfigError;
use crate::params::PsiTablesFiltering;
use crate::tokens::{atoi, Tokens};

/// PID used for T2-MI when the configured one is out of range.
pub const DEFAULT_T2MI_PID: u16 = 4096;

pub struct LocalSection;

impl SectionParser for LocalSection {
    fn section(&self) -> &'static str {
        "Main"
    }

    fn try_parse(
        &self,
        ctx: &mut ParseContext<'_>,
        keyword: &str,
        args: &mut Tokens<'_>,
    ) -> Result<Recognized, ConfigError> {
        match keyword {
            "new_channel" => {
                let idx = ctx.store.channels.open_channel()?;
                ctx.current = Some(idx);
                info!("New channel, current number {}", idx);
            }
            "timeout_no_diff" => ctx.store.engine.timeout_no_diff = args.uint(keyword)?,
            "tuning_no_diff" => ctx.store.engine.tuning_no_diff = args.uint(keyword)?,
            "dont_send_scrambled" => ctx.store.engine.dont_send_scrambled = args.flag(keyword)?,
            "filter_transport_error" => {
                ctx.store.engine.filter_transport_error = args.flag(keyword)?
            }
            "psi_tables_filtering" => psi_tables_filtering(ctx, keyword, args)?,
            "dvr_buffer_size" => {
                let size = args.int(keyword)?;
                let buffering = &mut ctx.store.buffering;
                buffering.dvr_buffer_size = if size <= 0 {
                    warn!("The buffer size MUST be >0, forced to 1 packet");
                    1
                } else {
                    u32::try_from(size).unwrap_or(u32::MAX)
                };
                buffering.show_buffer_stats = true;
            }
            "dvr_thread" => {
                let threaded = args.flag(keyword)?;
                if threaded {
                    warn!("You want to use a thread for reading the card, please report bugs/problems");
                }
                ctx.store.buffering.threaded_read = threaded;
            }
            "dvr_thread_buffer_size" => {
                ctx.store.buffering.max_thread_buffer_size = args.uint(keyword)?
            }
            "service_id" | "ts_id" => {
                if keyword == "ts_id" {
                    warn!("The option ts_id is depreciated, use service_id instead.");
                }
                let channel = ctx.channel_mut(keyword)?;
                let raw = args.value(keyword)?;
                let sid = u16::try_from(atoi(raw)).map_err(|_| ConfigError::invalid(keyword, raw))?;
                channel.service_id = Some(sid);
            }
            "pids" => {
                let channel_idx = ctx.current;
                let channel = ctx.channel_mut(keyword)?;
                let mut pids = Vec::new();
                for raw in args.by_ref() {
                    let pid = atoi(raw);
                    if !(PID_MIN..=PID_MAX).contains(&pid) {
                        return Err(ConfigError::PidOutOfRange { pid });
                    }
                    pids.push(pid as u16);
                    if pids.len() >= MAX_PIDS {
                        return Err(ConfigError::TooManyPids {
                            count: pids.len(),
                            channel: channel_idx.unwrap_or_default(),
                        });
                    }
                }
                channel.pids = pids;
                channel.pids_user_set = true;
                channel.pmt_rewrite = true;
            }
            "pmt_pid" => {
                let channel = ctx.channel_mut(keyword)?;
                let pid = args.int(keyword)?;
                if !(PID_MIN..=PMT_PID_MAX).contains(&pid) {
                    return Err(ConfigError::PmtPidOutOfRange { pid });
                }
                channel.pmt_pid = Some(pid as u16);
            }
            "name" => {
                let channel = ctx.channel_mut(keyword)?;
                let raw = args.rest_after_eq().ok_or_else(|| ConfigError::MissingValue {
                    keyword: keyword.to_string(),
                })?;
                if raw.len() >= MAX_NAME_LEN - 1 {
                    warn!("Channel name too long");
                }
                let name = truncate_utf8(raw, MAX_NAME_LEN - 1);
                channel.name = name.to_string();
                channel.user_name = name.to_string();
                channel.name_user_set = true;
            }
            "server_id" => ctx.store.engine.server_id = args.int(keyword)?,
            "filename_pid" => {
                if let Some(path) = path_value(keyword, args)? {
                    ctx.store.engine.filename_pid = path;
                }
            }
            "check_cc" => ctx.store.engine.check_cc = args.flag(keyword)?,
            "t2mi_pid" => {
                let pid = args.int(keyword)?;
                info!("Demuxing T2-MI stream on pid {} as input", pid);
                ctx.store.engine.t2mi_pid = if (1..=PID_MAX).contains(&pid) {
                    pid as u16
                } else {
                    warn!("wrong t2mi pid, forced to {}", DEFAULT_T2MI_PID);
                    DEFAULT_T2MI_PID
                };
            }
            "t2mi_plp" => {
                let raw = args.value(keyword)?;
                ctx.store.engine.t2mi_plp =
                    u8::try_from(atoi(raw)).map_err(|_| ConfigError::invalid(keyword, raw))?;
            }
            _ => return Ok(Recognized::NotMine),
        }
        Ok(Recognized::Handled)
    }
}

// Unknown modes keep the previous setting.
fn psi_tables_filtering(
    ctx: &mut ParseContext<'_>,
    keyword: &str,
    args: &mut Tokens<'_>,
) -> Result<(), ConfigError> {
    match parse_value::<PsiTablesFiltering>(keyword, args) {
        Ok(mode) => ctx.store.engine.psi_tables_filtering = mode,
        Err(ConfigError::InvalidValue { value, .. }) => {
            warn!("psi_tables_filtering : unknown mode {}, ignored", value);
        }
        Err(e) => return Err(e),
    }
    match ctx.store.engine.psi_tables_filtering {
        PsiTablesFiltering::PatOnly => {
            info!("You have enabled PSI tables filtering, only PAT will be send")
        }
        PsiTablesFiltering::PatCatOnly => {
            info!("You have enabled PSI tables filtering, only PAT and CAT will be send")
        }
        PsiTablesFiltering::None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Readiness;
    use crate::params::ParameterStore;

    fn parse(
        store: &mut ParameterStore,
        current: &mut Option<usize>,
        line: &str,
    ) -> Result<Recognized, ConfigError> {
        let mut tokens = Tokens::new(line);
        let keyword = tokens.next_token().unwrap();
        let mut ctx = ParseContext::new(store, *current);
        let answer = LocalSection.try_parse(&mut ctx, keyword, &mut tokens);
        *current = ctx.current;
        answer
    }

    #[test]
    fn test_new_channel_moves_cursor() {
        let mut store = ParameterStore::new();
        let mut current = None;
        parse(&mut store, &mut current, "new_channel").unwrap();
        assert_eq!(current, Some(0));
        parse(&mut store, &mut current, "new_channel").unwrap();
        assert_eq!(current, Some(1));
        assert_eq!(store.channels.len(), 2);
        assert_eq!(
            store.channels.get(1).unwrap().readiness,
            Readiness::AlmostReady
        );
    }

    #[test]
    fn test_pids_boundaries() {
        for (pid, ok) in [(9, false), (10, true), (8192, true), (8193, false)] {
            let mut store = ParameterStore::new();
            let mut current = None;
            parse(&mut store, &mut current, "new_channel").unwrap();
            let answer = parse(&mut store, &mut current, &format!("pids = {}", pid));
            assert_eq!(answer.is_ok(), ok, "pid {}", pid);

            let channel = store.channels.get(0).unwrap();
            if ok {
                assert_eq!(channel.pids, vec![pid as u16]);
                assert!(channel.pids_user_set);
                assert!(channel.pmt_rewrite);
            } else {
                assert!(matches!(answer, Err(ConfigError::PidOutOfRange { .. })));
                assert!(channel.pids.is_empty());
                assert!(!channel.pids_user_set);
            }
        }
    }

    #[test]
    fn test_pids_rejected_keeps_previous_list() {
        let mut store = ParameterStore::new();
        let mut current = None;
        parse(&mut store, &mut current, "new_channel").unwrap();
        parse(&mut store, &mut current, "pids = 100 101").unwrap();
        assert!(parse(&mut store, &mut current, "pids = 200 5").is_err());
        assert_eq!(store.channels.get(0).unwrap().pids, vec![100, 101]);
    }

    #[test]
    fn test_too_many_pids() {
        let mut store = ParameterStore::new();
        let mut current = None;
        parse(&mut store, &mut current, "new_channel").unwrap();
        let list: Vec<String> = (100..100 + MAX_PIDS).map(|p| p.to_string()).collect();
        let answer = parse(&mut store, &mut current, &format!("pids = {}", list.join(" ")));
        assert!(matches!(answer, Err(ConfigError::TooManyPids { .. })));
    }

    #[test]
    fn test_channel_scoped_without_channel() {
        let mut store = ParameterStore::new();
        let mut current = None;
        for line in ["pids = 100", "pmt_pid = 100", "name = Foo", "service_id = 1"] {
            assert!(matches!(
                parse(&mut store, &mut current, line),
                Err(ConfigError::NoChannel { .. })
            ));
        }
    }

    #[test]
    fn test_pmt_pid_range() {
        let mut store = ParameterStore::new();
        let mut current = None;
        parse(&mut store, &mut current, "new_channel").unwrap();
        parse(&mut store, &mut current, "pmt_pid = 8191").unwrap();
        assert_eq!(store.channels.get(0).unwrap().pmt_pid, Some(8191));
        assert!(matches!(
            parse(&mut store, &mut current, "pmt_pid = 8192"),
            Err(ConfigError::PmtPidOutOfRange { pid: 8192 })
        ));
    }

    #[test]
    fn test_name_keeps_spaces_and_truncates() {
        let mut store = ParameterStore::new();
        let mut current = None;
        parse(&mut store, &mut current, "new_channel").unwrap();
        parse(&mut store, &mut current, "name = France 2 HD").unwrap();
        let channel = store.channels.get(0).unwrap();
        assert_eq!(channel.name, "France 2 HD");
        assert_eq!(channel.user_name, "France 2 HD");
        assert!(channel.name_user_set);

        let long = "x".repeat(400);
        parse(&mut store, &mut current, &format!("name = {}", long)).unwrap();
        assert_eq!(store.channels.get(0).unwrap().name.len(), MAX_NAME_LEN - 1);
    }

    #[test]
    fn test_dvr_buffer_size_floor() {
        let mut store = ParameterStore::new();
        let mut current = None;
        parse(&mut store, &mut current, "dvr_buffer_size = 0").unwrap();
        assert_eq!(store.buffering.dvr_buffer_size, 1);
        assert!(store.buffering.show_buffer_stats);
        parse(&mut store, &mut current, "dvr_buffer_size = 40").unwrap();
        assert_eq!(store.buffering.dvr_buffer_size, 40);
    }

    #[test]
    fn test_t2mi_pid_forced() {
        let mut store = ParameterStore::new();
        let mut current = None;
        parse(&mut store, &mut current, "t2mi_pid = 0").unwrap();
        assert_eq!(store.engine.t2mi_pid, DEFAULT_T2MI_PID);
        parse(&mut store, &mut current, "t2mi_pid = 8192").unwrap();
        assert_eq!(store.engine.t2mi_pid, 8192);
    }

    #[test]
    fn test_psi_tables_filtering_unknown_kept() {
        let mut store = ParameterStore::new();
        let mut current = None;
        parse(&mut store, &mut current, "psi_tables_filtering = pat").unwrap();
        parse(&mut store, &mut current, "psi_tables_filtering = everything").unwrap();
        assert_eq!(
            store.engine.psi_tables_filtering,
            PsiTablesFiltering::PatOnly
        );
    }

    #[test]
    fn test_not_mine() {
        let mut store = ParameterStore::new();
        let mut current = None;
        assert_eq!(
            parse(&mut store, &mut current, "frobnicate = 1").unwrap(),
            Recognized::NotMine
        );
    }
}
