use preprocessing_engine::text::{hashing_trick, one_hot, text_to_word_sequence, HashFunction, TextSplitConfig};

#[test]
fn splitting_matches_common_usage() {
    let words = text_to_word_sequence("Hello, world! It's a nice\tday.", &TextSplitConfig::default()).unwrap();
    assert_eq!(words, vec!["hello", "world", "it's", "a", "nice", "day"]);
}

#[test]
fn one_hot_indices_are_in_range() {
    let text = "the quick brown fox jumps over the lazy dog";
    for n in [2usize, 3, 17, 1000] {
        let idx = one_hot(text, n, &TextSplitConfig::default()).unwrap();
        assert_eq!(idx.len(), 9);
        assert!(idx.iter().all(|&i| i >= 1 && i < n));
        assert_eq!(idx[0], idx[6]);
    }
}

#[test]
fn md5_hashing_is_stable_across_calls() {
    let cfg = TextSplitConfig::default();
    let a = hashing_trick("stable words here", 50, HashFunction::Md5, &cfg).unwrap();
    let b = hashing_trick("Stable, words; here!", 50, HashFunction::Md5, &cfg).unwrap();
    assert_eq!(a, b);
}
