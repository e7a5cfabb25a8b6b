//! Native implementations registered by `NativeRegistry::with_defaults`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::vm::class_loader::{CLASS, OBJECT, PRINT_STREAM, STRING, SYSTEM};
use crate::vm::error::Error;

use super::{arg, NativeRegistry, NativeValue};

fn since_epoch() -> std::time::Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default()
}

pub fn register(registry: &mut NativeRegistry) {
    for class in &[OBJECT, SYSTEM, CLASS] {
        registry.register(class, "registerNatives", "()V", |_, _| Ok(None));
    }

    registry.register(OBJECT, "hashCode", "()I", |_, args| {
        let this = arg(args, 0)?.as_reference()?;
        Ok(Some(NativeValue::Int(this.identity_hash())))
    });
    registry.register(OBJECT, "getClass", "()Ljava/lang/Class;", |loader, args| {
        let this = arg(args, 0)?.as_reference()?;
        let class = this.get_class().ok_or(Error::NullPointer)?;
        Ok(Some(NativeValue::Reference(loader.class_object(&class)?)))
    });

    registry.register(SYSTEM, "identityHashCode", "(Ljava/lang/Object;)I", |_, args| {
        let object = arg(args, 0)?.as_reference()?;
        Ok(Some(NativeValue::Int(object.identity_hash())))
    });
    registry.register(SYSTEM, "currentTimeMillis", "()J", |_, _| {
        Ok(Some(NativeValue::Long(since_epoch().as_millis() as i64)))
    });
    registry.register(SYSTEM, "nanoTime", "()J", |_, _| {
        Ok(Some(NativeValue::Long(since_epoch().as_nanos() as i64)))
    });

    registry.register(STRING, "intern", "()Ljava/lang/String;", |loader, args| {
        let this = arg(args, 0)?.as_reference()?.non_null()?;
        let text = this.as_rust_string().ok_or_else(|| Error::TypeMismatch {
            expected: "string",
            found: format!("{:?}", this),
        })?;
        Ok(Some(NativeValue::Reference(loader.intern_string(&text)?)))
    });

    registry.register(PRINT_STREAM, "flush", "()V", |_, _| Ok(None));

    registry.register("java/lang/Float", "floatToRawIntBits", "(F)I", |_, args| {
        Ok(Some(NativeValue::Int(arg(args, 0)?.as_float()?.to_bits() as i32)))
    });
    registry.register("java/lang/Float", "intBitsToFloat", "(I)F", |_, args| {
        Ok(Some(NativeValue::Float(f32::from_bits(arg(args, 0)?.as_int()? as u32))))
    });
    registry.register("java/lang/Double", "doubleToRawLongBits", "(D)J", |_, args| {
        Ok(Some(NativeValue::Long(arg(args, 0)?.as_double()?.to_bits() as i64)))
    });
    registry.register("java/lang/Double", "longBitsToDouble", "(J)D", |_, args| {
        Ok(Some(NativeValue::Double(f64::from_bits(arg(args, 0)?.as_long()? as u64))))
    });

    registry.register("java/lang/StrictMath", "sqrt", "(D)D", |_, args| {
        Ok(Some(NativeValue::Double(arg(args, 0)?.as_double()?.sqrt())))
    });
    registry.register("java/lang/StrictMath", "pow", "(DD)D", |_, args| {
        let base = arg(args, 0)?.as_double()?;
        let exponent = arg(args, 1)?.as_double()?;
        Ok(Some(NativeValue::Double(base.powf(exponent))))
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vm::class_loader::ClassLoader;
    use crate::vm::heap::Object;
    use crate::vm::value::Reference;

    #[test]
    fn test_identity_natives() {
        let mut loader = ClassLoader::new().unwrap();
        let registry = NativeRegistry::with_defaults();
        let object_class = loader.find_class(OBJECT).unwrap();
        let object = Reference::new_object(Object::new(object_class.clone()));
        let args = [NativeValue::Reference(object.clone())];

        let hash_code = registry.lookup(OBJECT, "hashCode", "()I").unwrap();
        let identity = registry.lookup(SYSTEM, "identityHashCode", "(Ljava/lang/Object;)I")
            .unwrap();
        assert_eq!(hash_code(&mut loader, &args).unwrap(),
                   identity(&mut loader, &args).unwrap());

        let get_class = registry.lookup(OBJECT, "getClass", "()Ljava/lang/Class;").unwrap();
        let class_object = loader.class_object(&object_class).unwrap();
        assert_eq!(get_class(&mut loader, &args).unwrap(),
                   Some(NativeValue::Reference(class_object)));
    }

    #[test]
    fn test_intern() {
        let mut loader = ClassLoader::new().unwrap();
        let registry = NativeRegistry::with_defaults();
        let intern = registry.lookup(STRING, "intern", "()Ljava/lang/String;").unwrap();
        let fresh = loader.new_string("abc").unwrap();
        let canonical = loader.intern_string("abc").unwrap();
        assert_eq!(intern(&mut loader, &[NativeValue::Reference(fresh)]).unwrap(),
                   Some(NativeValue::Reference(canonical)));
    }
}
