//! 实体基础 trait

/// 实体 trait
///
/// 实体由存储分配的标识区分，而不是由属性值区分
pub trait Entity {
    type Id;

    fn id(&self) -> &Self::Id;
}
