/// Single source of truth for all commands
/// This macro takes a wrapper macro path and applies it to the command list
#[macro_export]
macro_rules! with_commands {
    ($($wrapper:tt)*) => {
        $($wrapper)*![
            // Status and snapshot
            $crate::commands::get_status,
            $crate::commands::get_snapshot,
            $crate::commands::get_effective_backend,
            $crate::commands::load_configuration,
            // Service operations
            $crate::commands::change_backend,
            $crate::commands::reconfigure,
            $crate::commands::restart_service,
            // Raw config editor
            $crate::commands::get_config_text,
            $crate::commands::edit_config_text,
            $crate::commands::revert_config_edits,
            $crate::commands::validate_config,
            $crate::commands::save_config,
            $crate::commands::save_config_and_restart,
            $crate::commands::reveal_config_file,
            // Model settings
            $crate::commands::get_models,
            $crate::commands::get_dirty_models,
            $crate::commands::patch_model,
            $crate::commands::replace_models,
            $crate::commands::save_model,
            $crate::commands::save_all_models,
            // Panel preferences
            $crate::commands::load_panel_config,
            $crate::commands::save_panel_config,
            $crate::commands::reset_panel_config,
        ]
    };
}
