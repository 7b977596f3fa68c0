const LABEL_MAX_CHARS: usize = 20;
const LABEL_KEEP_CHARS: usize = 17;

pub fn truncate_label(title: &str) -> String {
    if title.chars().count() <= LABEL_MAX_CHARS {
        return title.to_owned();
    }

    let mut label = title.chars().take(LABEL_KEEP_CHARS).collect::<String>();
    label.push_str("...");
    label
}
