pub mod object_path;
