//! Fixed stop-word list for term ranking.
//!
//! Tokens are ASCII alphanumeric runs of at least two characters, so the list
//! holds contractions split (`don`, `isn`) and has no single letters.

use std::collections::HashSet;
use std::sync::LazyLock;

const WORDS: &[&str] = &[
    // recurring words in international news coverage
    "prevent", "address", "sanctions", "change", "events", "region", "warning", "issue", "programs",
    "response", "leader", "administration", "situation", "public", "discusses", "international",
    "officials", "strategy", "decision", "impact", "states", "united", "support", "focus", "test",
    "text", "nuclear",
    // general English
    "0o", "0s", "3a", "3b", "3d", "6b", "6o", "a1", "a2", "a3", "a4", "ab", "able", "about",
    "above", "abst", "ac", "accordance", "according", "accordingly", "across", "act", "actually",
    "ad", "added", "adj", "ae", "af", "affected", "affecting", "affects", "after", "afterwards",
    "ag", "again", "against", "ah", "ain", "aj", "al", "all", "allow", "allows", "almost", "alone",
    "along", "already", "also", "although", "always", "am", "among", "amongst", "amoungst",
    "amount", "an", "and", "announce", "another", "any", "anybody", "anyhow", "anymore", "anyone",
    "anything", "anyway", "anyways", "anywhere", "ao", "ap", "apart", "apparently", "appear",
    "appreciate", "appropriate", "approximately", "ar", "are", "aren", "arent", "arise", "around",
    "as", "aside", "ask", "asking", "associated", "at", "au", "auth", "av", "available", "aw",
    "away", "awfully", "ax", "ay", "az", "b1", "b2", "b3", "ba", "back", "bc", "bd", "be", "became",
    "because", "become", "becomes", "becoming", "been", "before", "beforehand", "begin",
    "beginning", "beginnings", "begins", "behind", "being", "believe", "below", "beside", "besides",
    "best", "better", "between", "beyond", "bi", "bill", "biol", "bj", "bk", "bl", "bn", "both",
    "bottom", "bp", "br", "brief", "briefly", "bs", "bt", "bu", "but", "bx", "by", "c1", "c2", "c3",
    "ca", "call", "came", "can", "cannot", "cant", "cause", "causes", "cc", "cd", "ce", "certain",
    "certainly", "cf", "cg", "ch", "changes", "ci", "cit", "cj", "cl", "clearly", "cm", "cn", "co",
    "com", "come", "comes", "con", "concerning", "consequently", "consider", "considering",
    "contain", "containing", "contains", "corresponding", "could", "couldn", "couldnt", "course",
    "cp", "cq", "cr", "cry", "cs", "ct", "cu", "currently", "cv", "cx", "cy", "cz", "d2", "da",
    "date", "dc", "dd", "de", "definitely", "describe", "described", "despite", "detail", "df",
    "di", "did", "didn", "different", "dj", "dk", "dl", "do", "does", "doesn", "doing", "don",
    "done", "down", "downwards", "dp", "dr", "ds", "dt", "du", "due", "during", "dx", "dy", "e2",
    "e3", "ea", "each", "ec", "ed", "edu", "ee", "ef", "effect", "eg", "ei", "eight", "eighty",
    "either", "ej", "el", "eleven", "else", "elsewhere", "em", "empty", "en", "end", "ending",
    "enough", "entirely", "eo", "ep", "eq", "er", "es", "especially", "est", "et", "etc", "eu",
    "ev", "even", "ever", "every", "everybody", "everyone", "everything", "everywhere", "ex",
    "exactly", "example", "except", "ey", "f2", "fa", "far", "fc", "few", "ff", "fi", "fifteen",
    "fifth", "fify", "fill", "find", "fire", "first", "five", "fix", "fj", "fl", "fn", "fo",
    "followed", "following", "follows", "for", "former", "formerly", "forth", "forty", "found",
    "four", "fr", "from", "front", "fs", "ft", "fu", "full", "further", "furthermore", "fy", "ga",
    "gave", "ge", "get", "gets", "getting", "gi", "give", "given", "gives", "giving", "gj", "gl",
    "go", "goes", "going", "gone", "got", "gotten", "gr", "greetings", "gs", "gy", "h2", "h3",
    "had", "hadn", "happens", "hardly", "has", "hasn", "hasnt", "have", "haven", "having", "he",
    "hed", "hello", "help", "hence", "her", "here", "hereafter", "hereby", "herein", "heres",
    "hereupon", "hers", "herself", "hes", "hh", "hi", "hid", "him", "himself", "his", "hither",
    "hj", "ho", "home", "hopefully", "how", "howbeit", "however", "hr", "hs", "http", "hu",
    "hundred", "hy", "i2", "i3", "i4", "i6", "i7", "i8", "ia", "ib", "ibid", "ic", "id", "ie", "if",
    "ig", "ignored", "ih", "ii", "ij", "il", "im", "immediate", "immediately", "importance",
    "important", "in", "inasmuch", "inc", "indeed", "index", "indicate", "indicated", "indicates",
    "information", "inner", "insofar", "instead", "interest", "into", "invention", "inward", "io",
    "ip", "iq", "ir", "is", "isn", "it", "itd", "its", "itself", "iv", "ix", "iy", "iz", "jj", "jr",
    "js", "jt", "ju", "just", "ke", "keep", "keeps", "kept", "kg", "kj", "km", "know", "known",
    "knows", "ko", "l2", "la", "largely", "last", "lately", "later", "latter", "latterly", "lb",
    "lc", "le", "least", "les", "less", "lest", "let", "lets", "lf", "like", "liked", "likely",
    "line", "little", "lj", "ll", "ln", "lo", "look", "looking", "looks", "los", "lr", "ls", "lt",
    "ltd", "m2", "ma", "made", "mainly", "make", "makes", "many", "may", "maybe", "me", "mean",
    "means", "meantime", "meanwhile", "merely", "mg", "might", "mightn", "mill", "million", "mine",
    "miss", "ml", "mn", "mo", "more", "moreover", "most", "mostly", "move", "mr", "mrs", "ms", "mt",
    "mu", "much", "mug", "must", "mustn", "my", "myself", "n2", "na", "name", "namely", "nay", "nc",
    "nd", "ne", "near", "nearly", "necessarily", "necessary", "need", "needn", "needs", "neither",
    "never", "nevertheless", "new", "next", "ng", "ni", "nine", "ninety", "nj", "nl", "nn", "no",
    "nobody", "non", "none", "nonetheless", "noone", "nor", "normally", "nos", "not", "noted",
    "nothing", "novel", "now", "nowhere", "nr", "ns", "nt", "ny", "oa", "ob", "obtain", "obtained",
    "obviously", "oc", "od", "of", "off", "often", "og", "oh", "oi", "oj", "ok", "okay", "ol",
    "old", "om", "omitted", "on", "once", "one", "ones", "only", "onto", "oo", "op", "oq", "or",
    "ord", "os", "ot", "other", "others", "otherwise", "ou", "ought", "our", "ours", "ourselves",
    "out", "outside", "over", "overall", "ow", "owing", "own", "ox", "oz", "p1", "p2", "p3", "page",
    "pagecount", "pages", "par", "part", "particular", "particularly", "pas", "past", "pc", "pd",
    "pe", "per", "perhaps", "pf", "ph", "pi", "pj", "pk", "pl", "placed", "please", "plus", "pm",
    "pn", "po", "poorly", "possible", "possibly", "potentially", "pp", "pq", "pr", "predominantly",
    "present", "presumably", "previously", "primarily", "probably", "promptly", "proud", "provides",
    "ps", "pt", "pu", "put", "py", "qj", "qu", "que", "quickly", "quite", "qv", "r2", "ra", "ran",
    "rather", "rc", "rd", "re", "readily", "really", "reasonably", "recent", "recently", "ref",
    "refs", "regarding", "regardless", "regards", "related", "relatively", "research",
    "respectively", "resulted", "resulting", "results", "rf", "rh", "ri", "right", "rj", "rl", "rm",
    "rn", "ro", "rq", "rr", "rs", "rt", "ru", "run", "rv", "ry", "s2", "sa", "said", "same", "saw",
    "say", "saying", "says", "sc", "sd", "se", "sec", "second", "secondly", "section", "see",
    "seeing", "seem", "seemed", "seeming", "seems", "seen", "self", "selves", "sensible", "sent",
    "serious", "seriously", "seven", "several", "sf", "shall", "shan", "she", "shed", "shes",
    "should", "shouldn", "show", "showed", "shown", "showns", "shows", "si", "side", "significant",
    "significantly", "similar", "similarly", "since", "sincere", "six", "sixty", "sj", "sl",
    "slightly", "sm", "sn", "so", "some", "somebody", "somehow", "someone", "somethan", "something",
    "sometime", "sometimes", "somewhat", "somewhere", "soon", "sorry", "sp", "specifically",
    "specified", "specify", "specifying", "sq", "sr", "ss", "st", "still", "stop", "strongly",
    "sub", "substantially", "successfully", "such", "sufficiently", "suggest", "sup", "sure", "sy",
    "system", "sz", "t1", "t2", "t3", "take", "taken", "taking", "tb", "tc", "td", "te", "tell",
    "ten", "tends", "tf", "th", "than", "thank", "thanks", "thanx", "that", "thats", "the", "their",
    "theirs", "them", "themselves", "then", "thence", "there", "thereafter", "thereby", "thered",
    "therefore", "therein", "thereof", "therere", "theres", "thereto", "thereupon", "these", "they",
    "theyd", "theyre", "thickv", "thin", "think", "third", "this", "thorough", "thoroughly",
    "those", "thou", "though", "thoughh", "thousand", "three", "throug", "through", "throughout",
    "thru", "thus", "ti", "til", "tip", "tj", "tl", "tm", "tn", "to", "together", "too", "took",
    "top", "toward", "towards", "tp", "tq", "tr", "tried", "tries", "truly", "try", "trying", "ts",
    "tt", "tv", "twelve", "twenty", "twice", "two", "tx", "u201d", "ue", "ui", "uj", "uk", "um",
    "un", "under", "unfortunately", "unless", "unlike", "unlikely", "until", "unto", "uo", "up",
    "upon", "ups", "ur", "us", "use", "used", "useful", "usefully", "usefulness", "uses", "using",
    "usually", "ut", "va", "value", "various", "vd", "ve", "very", "via", "viz", "vj", "vo", "vol",
    "vols", "volumtype", "vq", "vs", "vt", "vu", "wa", "want", "wants", "was", "wasn", "wasnt",
    "way", "we", "wed", "welcome", "well", "went", "were", "weren", "werent", "what", "whatever",
    "whats", "when", "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein",
    "wheres", "whereupon", "wherever", "whether", "which", "while", "whim", "whither", "who",
    "whod", "whoever", "whole", "whom", "whomever", "whos", "whose", "why", "wi", "widely", "will",
    "willing", "wish", "with", "within", "without", "wo", "won", "wonder", "wont", "words", "world",
    "would", "wouldn", "wouldnt", "www", "x1", "x2", "x3", "xf", "xi", "xj", "xk", "xl", "xn", "xo",
    "xs", "xt", "xv", "xx", "y2", "yes", "yet", "yj", "yl", "you", "youd", "your", "youre", "yours",
    "yourself", "yourselves", "yr", "ys", "yt", "zero", "zi", "zz",
];

static STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| WORDS.iter().copied().collect());

pub(crate) fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_and_newsroom_words_are_excluded() {
        for word in ["united", "states", "officials", "international", "sanctions", "u201d"] {
            assert!(is_stopword(word), "{word} should be a stop word");
        }
    }

    #[test]
    fn topical_words_are_kept() {
        for word in ["safe", "risky", "reactor", "waste", "energy"] {
            assert!(!is_stopword(word), "{word} should not be a stop word");
        }
    }

    #[test]
    fn every_entry_is_a_possible_token() {
        for word in WORDS {
            assert!(word.len() >= 2, "{word}");
            assert!(word.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()), "{word}");
        }
    }
}
