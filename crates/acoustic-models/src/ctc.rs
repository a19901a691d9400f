//! Символьный словарь и CTC greedy-декодирование выхода softmax.
//!
//! Словарь из 28 символов: `'` (0), пробел (1), `a`..`z` (2..=27).
//! Blank: последний класс (28), как у Keras `ctc_batch_cost`.

use std::collections::HashMap;

use candle_core::{D, Result, Tensor};
use tracing::debug;

/// Отображение символ ↔ индекс класса.
#[derive(Debug, Clone)]
pub struct CharMap {
    chars: Vec<char>,
    index: HashMap<char, usize>,
}

impl CharMap {
    /// Английский алфавит: `'`, пробел, `a`..`z`.
    pub fn english() -> Self {
        let chars: Vec<char> = ['\'', ' '].into_iter().chain('a'..='z').collect();
        Self::from_chars(chars)
    }

    pub fn from_chars(chars: Vec<char>) -> Self {
        let index = chars.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self { chars, index }
    }

    /// Количество символов (без blank).
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Индекс blank-класса.
    pub fn blank_id(&self) -> usize {
        self.chars.len()
    }

    /// Текст → индексы. Регистр не важен, неизвестные символы пропускаются.
    pub fn text_to_int(&self, text: &str) -> Vec<usize> {
        text.chars()
            .flat_map(char::to_lowercase)
            .filter_map(|c| self.index.get(&c).copied())
            .collect()
    }

    /// Индексы → текст. Blank и индексы вне словаря пропускаются.
    pub fn int_to_text(&self, ids: &[usize]) -> String {
        ids.iter().filter_map(|&id| self.chars.get(id)).collect()
    }
}

impl Default for CharMap {
    fn default() -> Self {
        Self::english()
    }
}

/// CTC greedy-декодер поверх [`CharMap`].
pub struct CtcGreedyDecoder {
    chars: CharMap,
    blank_id: usize,
}

impl CtcGreedyDecoder {
    pub fn new(chars: CharMap) -> Self {
        let blank_id = chars.blank_id();
        Self { chars, blank_id }
    }

    pub fn blank_id(&self) -> usize {
        self.blank_id
    }

    /// Свернуть последовательность классов: убрать повторы, затем blank.
    pub fn collapse(&self, ids: &[u32]) -> Vec<usize> {
        let blank = self.blank_id as u32;
        let mut out = Vec::new();
        let mut prev = blank;
        for &id in ids {
            if id != blank && id != prev {
                out.push(id as usize);
            }
            prev = id;
        }
        out
    }

    /// Декодировать вероятности `(time, classes)` в текст.
    ///
    /// `valid_length` ограничивает декодирование первыми фреймами
    /// (длина выхода модели для исходной длины входа).
    pub fn decode(&self, probs: &Tensor, valid_length: Option<usize>) -> Result<String> {
        let (time, _classes) = probs.dims2()?;
        let time = valid_length.map_or(time, |len| len.min(time));
        if time == 0 {
            return Ok(String::new());
        }

        let ids: Vec<u32> = probs.narrow(0, 0, time)?.argmax(D::Minus1)?.to_vec1()?;
        let collapsed = self.collapse(&ids);
        debug!("CTC: {} фреймов → {} символов", time, collapsed.len());
        Ok(self.chars.int_to_text(&collapsed))
    }

    /// Декодировать батч `(batch, time, classes)`.
    pub fn decode_batch(&self, probs: &Tensor, valid_lengths: Option<&[usize]>) -> Result<Vec<String>> {
        let batch = probs.dim(0)?;
        (0..batch)
            .map(|i| {
                let len = valid_lengths.and_then(|l| l.get(i).copied());
                self.decode(&probs.get(i)?, len)
            })
            .collect()
    }
}

impl Default for CtcGreedyDecoder {
    fn default() -> Self {
        Self::new(CharMap::english())
    }
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;

    #[test]
    fn test_char_map_layout() {
        let map = CharMap::english();
        assert_eq!(map.len(), 28);
        assert_eq!(map.blank_id(), 28);
        assert_eq!(map.text_to_int("a b'"), vec![2, 1, 3, 0]);
        assert_eq!(map.text_to_int("Z"), vec![27]);
        assert_eq!(map.int_to_text(&[9, 6, 13, 13, 16]), "hello");
    }

    #[test]
    fn test_collapse_repeats_and_blanks() {
        let decoder = CtcGreedyDecoder::default();
        // h h _ e l l _ l o
        let ids = [9, 9, 28, 6, 13, 13, 28, 13, 16];
        let collapsed = decoder.collapse(&ids);
        assert_eq!(collapsed, vec![9, 6, 13, 13, 16]);
    }

    fn one_hot(ids: &[usize], classes: usize) -> Tensor {
        let mut data = vec![0f32; ids.len() * classes];
        for (t, &id) in ids.iter().enumerate() {
            data[t * classes + id] = 1.0;
        }
        Tensor::from_vec(data, (ids.len(), classes), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_decode_probabilities() {
        let decoder = CtcGreedyDecoder::default();
        let probs = one_hot(&[4, 4, 2, 28, 21, 28], 29);
        assert_eq!(decoder.decode(&probs, None).unwrap(), "cat");
        assert_eq!(decoder.decode(&probs, Some(3)).unwrap(), "ca");
        assert_eq!(decoder.decode(&probs, Some(0)).unwrap(), "");
    }

    #[test]
    fn test_decode_batch() {
        let decoder = CtcGreedyDecoder::default();
        let a = one_hot(&[2, 28, 3], 29);
        let b = one_hot(&[1, 1, 28], 29);
        let probs = Tensor::stack(&[&a, &b], 0).unwrap();
        let texts = decoder.decode_batch(&probs, None).unwrap();
        assert_eq!(texts, vec!["ab".to_string(), " ".to_string()]);
    }
}
