use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
    /// Tokens that carry no signal in URLs: scheme words, common TLDs, file
    /// extensions.
    static ref URL_NOISE: HashSet<&'static str> = {
        let words: &[&str] = &[
            "http", "https", "www", "com", "org", "net", "io", "co", "edu", "gov",
            "html", "htm", "php", "asp", "aspx", "index",
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Extract the set of normalized terms from free text: NFKC normalization,
/// lowercase, stopword removal, and stemming.
pub fn term_set(text: &str) -> HashSet<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut terms = HashSet::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str();
        if is_stopword(token) {
            continue;
        }
        terms.insert(STEMMER.stem(token).to_string());
    }
    terms
}

/// Extract the set of terms from a URL: split on non-alphanumerics, drop
/// noise tokens, single characters, and pure numbers. No stemming; URL
/// segments are matched verbatim.
pub fn url_term_set(url: &str) -> HashSet<String> {
    url.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| s.len() > 1)
        .filter(|s| !URL_NOISE.contains(s))
        .filter(|s| s.chars().any(|c| c.is_ascii_alphabetic()))
        .map(str::to_string)
        .collect()
}
