/// A description split into normalized tokens.
///
/// Tokens are lower-cased whitespace-separated words with surrounding
/// punctuation removed.
#[derive(Debug, Clone)]
pub(crate) struct Text {
  tokens: Vec<String>,
}

/// Single-word keywords at least this long also match as a prefix.
const STEM_MIN_LEN: usize = 5;

impl Text {
  pub fn new<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
    let tokens = parts
      .into_iter()
      .flat_map(str::split_whitespace)
      .map(|word| {
        word
          .to_lowercase()
          .trim_matches(|c: char| !c.is_alphanumeric())
          .to_string()
      })
      .filter(|token| !token.is_empty())
      .collect();
    Self { tokens }
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  /// Whether the keyword occurs at least once.
  pub fn contains(&self, keyword: &str) -> bool {
    let words: Vec<&str> = keyword.split_whitespace().collect();
    match words.as_slice() {
      [] => false,
      [word] => self.tokens.iter().any(|token| token_matches(token, word)),
      _ => self
        .tokens
        .windows(words.len())
        .any(|window| window.iter().zip(&words).all(|(token, word)| token == word)),
    }
  }

  /// Keywords from `keywords` that occur in the text, each at most once.
  pub fn matched<'k>(&self, keywords: &[&'k str]) -> Vec<&'k str> {
    keywords
      .iter()
      .copied()
      .filter(|keyword| self.contains(keyword))
      .collect()
  }
}

fn token_matches(token: &str, keyword: &str) -> bool {
  token == keyword || (keyword.chars().count() >= STEM_MIN_LEN && token.starts_with(keyword))
}

/// Number of words in a keyword.
pub(crate) fn word_count(keyword: &str) -> usize {
  keyword.split_whitespace().count()
}
