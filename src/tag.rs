/// Togglのタグを表す。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub tag_id: i64,
    pub name: String,
}
