//! Cross-subsystem defaults and consistency rules applied after parsing.
//!
//! [`resolve`] is a fixed point: running it on an already resolved store
//! changes nothing.

use log::{debug, info, warn};

use crate::error::ConfigError;
use crate::params::ParameterStore;
use crate::template::{compute, TemplateValues};
use crate::tristate::Tristate;

/// Smallest DVR buffer, in packets, able to hold T2-MI frames.
pub const T2MI_MIN_DVR_BUFFER_SIZE: u32 = 20;

/// Apply the resolution rules to `store`, in order.
pub fn resolve(store: &mut ParameterStore) -> Result<(), ConfigError> {
    let card = *store.tuning.card.get_or_insert(0);

    if store.autoconf.is_enabled() {
        if store.sap.sap.is_undefined() && store.multicast.multicast {
            info!("Autoconfiguration, we activate SAP announces. if you want to disable them see the README.");
            store.sap.sap = Tristate::On;
        }
        if store.rewrite.rewrite_pat.is_undefined() {
            info!("Autoconfiguration, we activate PAT rewriting. if you want to disable it see the README.");
            store.rewrite.rewrite_pat = store.rewrite.rewrite_pat.resolve(true);
        }
        if store.rewrite.rewrite_sdt.is_undefined() {
            info!("Autoconfiguration, we activate SDT rewriting. if you want to disable it see the README.");
            store.rewrite.rewrite_sdt = store.rewrite.rewrite_sdt.resolve(true);
        }
    }

    let buffering = &mut store.buffering;
    if store.engine.t2mi_pid > 0 && buffering.dvr_buffer_size < T2MI_MIN_DVR_BUFFER_SIZE {
        warn!(
            "Warning : You set a DVR buffer size too low to accept T2-MI frames, I increase your dvr_buffer_size to {} ...",
            T2MI_MIN_DVR_BUFFER_SIZE
        );
        buffering.dvr_buffer_size = T2MI_MIN_DVR_BUFFER_SIZE;
    }
    if buffering.max_thread_buffer_size < buffering.dvr_buffer_size {
        warn!("Warning : You set a thread buffer size lower than your DVR buffer size, it's not possible to use such values. I increase your dvr_thread_buffer_size ...");
        buffering.max_thread_buffer_size = buffering.dvr_buffer_size;
    }

    expand_templates(store, card)?;

    let multicast = &mut store.multicast;
    if multicast.ttl == 0 && multicast.multicast {
        info!("The multicast TTL is set to 0, multicast will be disabled.");
        multicast.multicast_ipv4 = false;
        multicast.multicast_ipv6 = false;
        multicast.refresh();
    }
    if !multicast.multicast {
        if multicast.rtp_header {
            info!("NO Multicast, RTP Header is disabled.");
            multicast.rtp_header = false;
        }
        if store.sap.sap.is_on() {
            info!("NO Multicast, SAP announces are disabled.");
            store.sap.sap = Tristate::Off;
        }
    }

    if !store.multicast.multicast && !store.unicast.unicast {
        return Err(ConfigError::NoOutput);
    }
    Ok(())
}

fn expand_templates(store: &mut ParameterStore, card: u32) -> Result<(), ConfigError> {
    let values = TemplateValues {
        card,
        tuner: store.tuning.tuner,
        server: store.engine.server_id,
    };

    store.tuning.card_dev_path = values.expand(&store.tuning.card_dev_path);

    if let Some(port_str) = store.unicast.port_out_str.as_mut() {
        *port_str = values.expand(port_str);
        let port = compute(port_str)
            .and_then(|port| u16::try_from(port).ok())
            .ok_or_else(|| ConfigError::invalid("port_http", port_str))?;
        debug!("computed unicast master port : {}", port);
        store.unicast.port_out = Some(port);
    }

    if let Some(log_file) = store.logging.log_file.as_mut() {
        *log_file = values.expand(log_file);
    }

    store.engine.filename_pid = values.expand(&store.engine.filename_pid);
    Ok(())
}
