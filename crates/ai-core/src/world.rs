use crate::EntityId;

/// Read access to the simulation the agents live in.
///
/// The director only needs to know whether an entity reference is still valid. Domain systems
/// (economy, diplomacy, military) expose their own queries on the concrete world type; agent
/// logic is generic over that type and reaches them directly during its decision step.
pub trait WorldView {
    fn entity_exists(&self, entity: EntityId) -> bool;
}
