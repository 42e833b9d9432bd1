use std::collections::{HashMap, HashSet};

use jieba_rs::Jieba;
use regex::Regex;

/// 去重后的词频，按 count 降序
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

pub struct ChineseTokenizer {
    //分词正则
    regex: Regex,
    jieba: Jieba,
    stopwords: HashSet<String>,
}

impl Default for ChineseTokenizer {
    fn default() -> Self {
        let regex = Regex::new("\\w[\\w']*").expect("Unable to compile tokenization regex");

        ChineseTokenizer {
            regex,
            jieba: Jieba::new(),
            stopwords: Default::default(),
        }
    }
}

impl<'a> ChineseTokenizer {
    pub fn with_stopwords(mut self, stopwords: HashSet<String>) -> Self {
        self.stopwords = stopwords;
        self
    }

    /// User-dictionary terms take priority over jieba's statistical
    /// segmentation.
    pub fn with_user_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            self.jieba.add_word(word.as_ref(), None, None);
        }
        self
    }

    pub fn tokenize(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> {
        self.regex
            .find_iter(text)
            .map(|mat| mat.as_str())
            .filter(|str| !str.is_empty())
            .flat_map(|str| self.jieba.cut(str, false))
    }

    /// Lowercases and trims every token, drops single characters and
    /// stopwords, then ranks the survivors by count descending. Ties fall
    /// back to the word itself so the order is total and reproducible.
    pub fn count_words(&self, text: &str) -> Vec<WordCount> {
        let mut counts: HashMap<String, usize> = HashMap::new();

        for token in self.tokenize(text) {
            let word = token.trim().to_lowercase();
            if word.chars().count() <= 1 || self.stopwords.contains(&word) {
                continue;
            }
            *counts.entry(word).or_insert(0) += 1;
        }

        let mut ranked: Vec<WordCount> = counts
            .into_iter()
            .map(|(word, count)| WordCount { word, count })
            .collect();

        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));

        ranked
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::ChineseTokenizer;

    #[test]
    fn counts_are_ranked_descending() {
        let tokenizer = ChineseTokenizer::default().with_user_words(["词云"]);
        let ranked = tokenizer.count_words("测试 测试 词云 词云 词云");

        assert_eq!(ranked[0].word, "词云");
        assert_eq!(ranked[0].count, 3);
        assert_eq!(ranked[1].word, "测试");
        assert_eq!(ranked[1].count, 2);
    }

    #[test]
    fn stopwords_and_single_characters_are_dropped() {
        let stopwords: HashSet<String> = ["词云".to_string()].into_iter().collect();
        let tokenizer = ChineseTokenizer::default()
            .with_user_words(["词云"])
            .with_stopwords(stopwords);

        let ranked = tokenizer.count_words("词云 词云 a b 了");
        assert!(ranked.is_empty());
    }

    #[test]
    fn ties_break_by_word_for_a_stable_order() {
        let tokenizer = ChineseTokenizer::default();
        let a = tokenizer.count_words("apple banana apple banana");
        let b = tokenizer.count_words("banana apple banana apple");

        assert_eq!(a, b);
        assert_eq!(a[0].word, "apple");
    }

    #[test]
    fn user_dictionary_keeps_terms_atomic() {
        let tokenizer = ChineseTokenizer::default().with_user_words(["奥利给"]);
        let ranked = tokenizer.count_words("奥利给 奥利给");

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].word, "奥利给");
        assert_eq!(ranked[0].count, 2);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let tokenizer = ChineseTokenizer::default();
        assert!(tokenizer.count_words("").is_empty());
    }
}
