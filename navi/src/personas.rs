use shared::flows::{self, ChatFlow};

/// A chat flow paired with the system instruction the model runs under.
/// Instructions are fixed at build time and never accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub flow: ChatFlow,
    pub system_instruction: &'static str,
}

impl Persona {
    pub fn slug(&self) -> &'static str {
        self.flow.slug
    }
}

pub const VISION_NAVI: Persona = Persona {
    flow: flows::VISION_NAVI,
    system_instruction: include_str!("../personas/vision_navi.md"),
};

pub const LIMIT_DETECTOR: Persona = Persona {
    flow: flows::LIMIT_DETECTOR,
    system_instruction: include_str!("../personas/limit_detector.md"),
};

pub static PERSONAS: [Persona; 2] = [VISION_NAVI, LIMIT_DETECTOR];

pub fn by_slug(slug: &str) -> Option<&'static Persona> {
    PERSONAS.iter().find(|persona| persona.slug() == slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_flow_has_a_persona() {
        for flow in flows::CHAT_FLOWS {
            let persona = by_slug(flow.slug).unwrap();
            assert_eq!(persona.flow, flow);
            assert!(!persona.system_instruction.trim().is_empty());
        }
    }
}
