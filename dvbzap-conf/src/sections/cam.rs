//! Hardware CAM directives.

use log::info;

use super::{ParseContext, Recognized, SectionParser};
use crate::error::ConfigError;
use crate::tokens::Tokens;

pub struct CamSection;

impl SectionParser for CamSection {
    fn section(&self) -> &'static str {
        "CAM"
    }

    fn try_parse(
        &self,
        ctx: &mut ParseContext<'_>,
        keyword: &str,
        args: &mut Tokens<'_>,
    ) -> Result<Recognized, ConfigError> {
        let cam = &mut ctx.store.cam;
        match keyword {
            "cam_support" => {
                cam.cam_support = args.flag(keyword)?;
                if cam.cam_support {
                    info!("You have enabled the support for conditional access modules (scrambled channels)");
                }
            }
            "cam_number" => cam.cam_number = args.uint(keyword)?,
            "cam_reset_interval" => cam.reset_interval = args.uint(keyword)?,
            "cam_delay_pmt_send" => cam.delay_pmt_send = args.uint(keyword)?,
            _ => return Ok(Recognized::NotMine),
        }
        Ok(Recognized::Handled)
    }
}
