//! The fixed intake script: an ordered, immutable table of prompts, each
//! bound to an explicit answer slot. The slot key is a first-class field so
//! wording can change without silently rebinding answers.

use crate::models::Answers;

pub const SLOT_NOME: &str = "Nome";
pub const SLOT_CONTATO: &str = "Contato";
pub const SLOT_WHAT: &str = "What?";
pub const SLOT_WHY: &str = "Why?";
pub const SLOT_WHO: &str = "Who?";
pub const SLOT_WHERE: &str = "Where?";
pub const SLOT_WHEN: &str = "When?";

/// Placeholder replaced with the captured `Nome` answer in interpolated
/// prompts.
const NAME_PLACEHOLDER: &str = "{nome}";

#[derive(Debug, Clone, Copy)]
pub struct ScriptEntry {
    /// Text shown to the visitor when this entry is asked.
    pub prompt: &'static str,
    /// Slot under which the visitor's reply to this prompt is recorded.
    pub slot: &'static str,
    /// Whether `prompt` contains the `{nome}` placeholder.
    pub interpolates_name: bool,
}

impl ScriptEntry {
    /// Renders the prompt, substituting the captured name when flagged.
    pub fn render(&self, answers: &Answers) -> String {
        if self.interpolates_name {
            let nome = answers.get(SLOT_NOME).map(String::as_str).unwrap_or("");
            self.prompt.replace(NAME_PLACEHOLDER, nome)
        } else {
            self.prompt.to_string()
        }
    }
}

/// The 5W2H intake walk: name and contact first, then the five structured
/// project questions. Strictly linear; the state machine indexes into this
/// table and never reorders it.
pub const INTAKE_SCRIPT: &[ScriptEntry] = &[
    ScriptEntry {
        prompt: "Olá! Que ótimo ter você por aqui. Para começarmos, qual é o seu nome?",
        slot: SLOT_NOME,
        interpolates_name: false,
    },
    ScriptEntry {
        prompt: "Prazer, {nome}! Qual é o seu melhor contato (e-mail ou telefone)?",
        slot: SLOT_CONTATO,
        interpolates_name: true,
    },
    ScriptEntry {
        prompt: "O que é o seu projeto? Me descreva a ideia principal com as suas palavras.",
        slot: SLOT_WHAT,
        interpolates_name: false,
    },
    ScriptEntry {
        prompt: "Por que esse projeto é importante para você ou para o seu negócio?",
        slot: SLOT_WHY,
        interpolates_name: false,
    },
    ScriptEntry {
        prompt: "Quem vai usar o resultado? Me fale sobre o público-alvo.",
        slot: SLOT_WHO,
        interpolates_name: false,
    },
    ScriptEntry {
        prompt: "Onde o projeto vai funcionar (site, aplicativo, loja física, redes sociais...)?",
        slot: SLOT_WHERE,
        interpolates_name: false,
    },
    ScriptEntry {
        prompt: "Quando você gostaria de ver o projeto no ar?",
        slot: SLOT_WHEN,
        interpolates_name: false,
    },
];

/// Serializes captured answers in script order, one `Slot: value` line per
/// filled slot. Used both as the summarization user content and as the lead
/// file body.
pub fn serialize_answers(answers: &Answers) -> String {
    INTAKE_SCRIPT
        .iter()
        .filter_map(|entry| {
            answers
                .get(entry.slot)
                .map(|value| format!("{}: {}", entry.slot, value))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_has_seven_entries_in_slot_order() {
        let slots: Vec<&str> = INTAKE_SCRIPT.iter().map(|e| e.slot).collect();
        assert_eq!(
            slots,
            vec![SLOT_NOME, SLOT_CONTATO, SLOT_WHAT, SLOT_WHY, SLOT_WHO, SLOT_WHERE, SLOT_WHEN]
        );
    }

    #[test]
    fn only_the_contact_prompt_interpolates_the_name() {
        let flagged: Vec<&str> = INTAKE_SCRIPT
            .iter()
            .filter(|e| e.interpolates_name)
            .map(|e| e.slot)
            .collect();
        assert_eq!(flagged, vec![SLOT_CONTATO]);
    }

    #[test]
    fn render_substitutes_the_captured_name() {
        let mut answers = Answers::new();
        answers.insert(SLOT_NOME.to_string(), "Maria".to_string());
        let text = INTAKE_SCRIPT[1].render(&answers);
        assert!(text.contains("Maria"));
        assert!(!text.contains("{nome}"));
    }

    #[test]
    fn render_with_missing_name_drops_the_placeholder() {
        let text = INTAKE_SCRIPT[1].render(&Answers::new());
        assert!(!text.contains("{nome}"));
    }

    #[test]
    fn serialize_answers_follows_script_order_and_skips_empty_slots() {
        let mut answers = Answers::new();
        answers.insert(SLOT_WHAT.to_string(), "um site".to_string());
        answers.insert(SLOT_NOME.to_string(), "Ana".to_string());
        assert_eq!(serialize_answers(&answers), "Nome: Ana\nWhat?: um site");
    }
}
