/// Togglのプロジェクトを表す。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub project_id: i64,
    pub name: String,
}
