//! Grouping of adjacent words into multi-word terms.
//!
//! Runs of title-cased words become a single name (`Juan de la Cruz`), and a
//! number followed by a unit becomes a single quantity (`3 años`).

use transcript_relations_core::models::Word;

/// Lower-case words allowed inside a name.
const FILLER_WORDS: [&str; 6] = ["de", "del", "la", "las", "lo", "los"];

/// Units completing a quantity.
const UNITS: [&str; 2] = ["años", "días"];

pub fn group_words(words: Vec<Word>) -> Vec<Word> {
    group_quantities(group_names(words))
}

/// Title case: upper-case letters only start a cased run, lower-case letters
/// only continue one, and at least one letter is cased.
fn is_title(s: &str) -> bool {
    let mut cased = false;
    let mut previous_cased = false;

    for c in s.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            cased = true;
        } else {
            previous_cased = false;
        }
    }

    cased
}

fn is_filler(s: &str) -> bool {
    FILLER_WORDS.contains(&s)
}

/// A multi-word entity collapses to one plain word.
fn emit_entity(out: &mut Vec<Word>, entity: Vec<Word>) {
    if entity.len() > 1 {
        let joined = entity.iter().map(Word::text).collect::<Vec<_>>().join(" ");
        out.push(Word::from(joined));
    } else {
        out.extend(entity);
    }
}

fn end_entity(out: &mut Vec<Word>, entity: &mut Vec<Word>, filler: &mut Vec<Word>) {
    if !entity.is_empty() {
        emit_entity(out, std::mem::take(entity));
    }
    out.append(filler);
}

pub fn group_names(words: Vec<Word>) -> Vec<Word> {
    let mut out = Vec::with_capacity(words.len());
    let mut entity: Vec<Word> = Vec::new();
    let mut filler: Vec<Word> = Vec::new();

    for word in words {
        let text = word.text();

        if is_title(text) {
            if is_filler(&text.to_lowercase()) {
                // A capitalised article starts a sentence unless it follows a name.
                if entity.is_empty() {
                    out.push(word);
                } else {
                    filler.push(word);
                }
            } else if matches!(word.tag(), Some("ADP") | Some("DET")) {
                end_entity(&mut out, &mut entity, &mut filler);
                out.push(word);
            } else {
                entity.append(&mut filler);
                entity.push(word);
            }
        } else if !entity.is_empty() && is_filler(text) {
            filler.push(word);
        } else {
            end_entity(&mut out, &mut entity, &mut filler);
            out.push(word);
        }
    }

    end_entity(&mut out, &mut entity, &mut filler);
    out
}

pub fn group_quantities(words: Vec<Word>) -> Vec<Word> {
    let mut out = Vec::with_capacity(words.len());
    let mut entity: Vec<Word> = Vec::new();

    for word in words {
        let text = word.text();

        if !text.is_empty() && text.chars().all(|c| c.is_numeric()) {
            if !entity.is_empty() {
                emit_entity(&mut out, std::mem::take(&mut entity));
            }
            entity.push(word);
        } else if UNITS.contains(&text) {
            entity.push(word);
            emit_entity(&mut out, std::mem::take(&mut entity));
        } else {
            if !entity.is_empty() {
                emit_entity(&mut out, std::mem::take(&mut entity));
            }
            out.push(word);
        }
    }

    if !entity.is_empty() {
        emit_entity(&mut out, entity);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcript_relations_core::models::Term;

    fn words(text: &str) -> Vec<Word> {
        text.split_whitespace().map(Word::from).collect()
    }

    fn texts(words: &[Word]) -> Vec<&str> {
        words.iter().map(Word::text).collect()
    }

    #[test]
    fn title_case_detection() {
        assert!(is_title("García"));
        assert!(is_title("Juan-Pablo"));
        assert!(!is_title("McDonald"));
        assert!(!is_title("casa"));
        assert!(!is_title("3"));
    }

    #[test]
    fn names_absorb_fillers() {
        let out = group_names(words("vino Juan de la Cruz ayer"));
        assert_eq!(texts(&out), ["vino", "Juan de la Cruz", "ayer"]);
    }

    #[test]
    fn trailing_fillers_are_released() {
        let out = group_names(words("María de la casa"));
        assert_eq!(texts(&out), ["María", "de", "la", "casa"]);
    }

    #[test]
    fn leading_article_is_not_a_name() {
        let out = group_names(words("La Habana Vieja es"));
        assert_eq!(texts(&out), ["La", "Habana Vieja", "es"]);
    }

    #[test]
    fn determiners_break_names() {
        let input = vec![
            Word::from("Pedro"),
            Word::from(Term::tagged("Este", "DET")),
            Word::from("Luis"),
        ];
        let out = group_names(input);
        assert_eq!(texts(&out), ["Pedro", "Este", "Luis"]);
    }

    #[test]
    fn quantities_are_grouped() {
        let out = group_quantities(words("hace 3 años y 2 5 días más 7"));
        assert_eq!(texts(&out), ["hace", "3 años", "y", "2", "5 días", "más", "7"]);
    }
}
