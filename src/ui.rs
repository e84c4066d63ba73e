use bevy::prelude::*;

use crate::HabUtilsSet;

/// Default time a message stays on screen, in seconds.
pub const MESSAGE_DURATION: f32 = 5.0;

/// A transient on-screen message for the player, e.g. a rejected action.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct ScreenMessage {
    pub text: String,
    pub duration: f32,
}

impl ScreenMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), duration: MESSAGE_DURATION }
    }
}

/// Messages currently shown, with the seconds each has left.
#[derive(Resource, Default, Debug)]
pub struct ScreenMessages {
    pub active: Vec<(String, f32)>,
}

impl ScreenMessages {
    pub fn contains(&self, text: &str) -> bool {
        self.active.iter().any(|(t, _)| t == text)
    }
}

pub struct ScreenMessagePlugin;

impl Plugin for ScreenMessagePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ScreenMessage>()
            .init_resource::<ScreenMessages>()
            .add_systems(
                Update,
                (post_screen_messages, expire_screen_messages)
                    .chain()
                    .in_set(HabUtilsSet::Observe),
            );
    }
}

pub fn post_screen_messages(
    mut events: EventReader<ScreenMessage>,
    mut messages: ResMut<ScreenMessages>,
) {
    for msg in events.read() {
        info!("[Screen] {}", msg.text);
        // re-posting a message refreshes it instead of stacking
        messages.active.retain(|(t, _)| t != &msg.text);
        messages.active.push((msg.text.clone(), msg.duration));
    }
}

pub fn expire_screen_messages(time: Res<Time>, mut messages: ResMut<ScreenMessages>) {
    let dt = time.delta_secs();
    if dt <= 0.0 || messages.active.is_empty() {
        return;
    }
    for (_, remaining) in messages.active.iter_mut() {
        *remaining -= dt;
    }
    messages.active.retain(|(_, remaining)| *remaining > 0.0);
}
